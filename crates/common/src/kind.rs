//! Numeric kinds understood by the virtual machine.

use crate::error::DecodeError;
use crate::opcode::OpCode;

/// How a 64-bit cell is interpreted.
///
/// The derive order is the widening order used by arithmetic: when two
/// operands of different kinds meet, the greater kind wins.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericKind {
    /// Signed 64-bit integer.
    Int = 0,
    /// Unsigned 64-bit integer.
    Uint = 1,
    /// IEEE 754 double.
    Double = 2,
}

/// All numeric kinds, in widening order.
pub const ALL_KINDS: [NumericKind; 3] = [NumericKind::Int, NumericKind::Uint, NumericKind::Double];

impl TryFrom<u8> for NumericKind {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NumericKind::Int),
            1 => Ok(NumericKind::Uint),
            2 => Ok(NumericKind::Double),
            _ => Err(DecodeError::UnknownNumericKind(value)),
        }
    }
}

impl NumericKind {
    /// Short display name.
    pub fn name(&self) -> &'static str {
        match self {
            NumericKind::Int => "INT",
            NumericKind::Uint => "UINT",
            NumericKind::Double => "DOUBLE",
        }
    }

    /// The in-place conversion that turns a register of this kind into
    /// `target`. Returns `None` when the kinds already agree.
    pub fn conversion_to(self, target: NumericKind) -> Option<OpCode> {
        match (self, target) {
            (NumericKind::Int, NumericKind::Uint) => Some(OpCode::TcItui),
            (NumericKind::Int, NumericKind::Double) => Some(OpCode::TcItd),
            (NumericKind::Uint, NumericKind::Int) => Some(OpCode::TcUiti),
            (NumericKind::Uint, NumericKind::Double) => Some(OpCode::TcUitd),
            (NumericKind::Double, NumericKind::Int) => Some(OpCode::TcDti),
            (NumericKind::Double, NumericKind::Uint) => Some(OpCode::TcDtui),
            _ => None,
        }
    }

    /// The kind two operands are brought to before a binary operation.
    pub fn common(self, other: NumericKind) -> NumericKind {
        self.max(other)
    }

    /// True for the two integer kinds.
    pub fn is_integer(&self) -> bool {
        !matches!(self, NumericKind::Double)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_kind_needs_no_conversion() {
        for kind in ALL_KINDS {
            assert_eq!(kind.conversion_to(kind), None);
        }
    }

    #[test]
    fn every_cross_conversion_is_defined() {
        for from in ALL_KINDS {
            for to in ALL_KINDS {
                if from != to {
                    assert!(from.conversion_to(to).is_some(), "{from:?} -> {to:?}");
                }
            }
        }
    }

    #[test]
    fn widening_order() {
        assert_eq!(NumericKind::Int.common(NumericKind::Uint), NumericKind::Uint);
        assert_eq!(NumericKind::Uint.common(NumericKind::Double), NumericKind::Double);
        assert_eq!(NumericKind::Double.common(NumericKind::Int), NumericKind::Double);
    }

    #[test]
    fn decode_kind() {
        assert_eq!(NumericKind::try_from(2), Ok(NumericKind::Double));
        assert_eq!(
            NumericKind::try_from(3),
            Err(DecodeError::UnknownNumericKind(3))
        );
    }
}
