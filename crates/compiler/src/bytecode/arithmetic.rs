//! Arithmetic, logic and comparison.
//!
//! Binary operands are brought to their common kind first; the result is
//! written over the left operand's register unless a pseudonym owns it.

use malachite_common::{flags, Instruction, NumericKind, OpCode};

use super::{ByteLowerer, Origin, Value};
use crate::diagnostics::Diagnostic;
use crate::pseudo::PseudoOp;

fn arithmetic_opcode(op: &PseudoOp, kind: NumericKind) -> Option<OpCode> {
    use NumericKind::{Double, Int, Uint};
    let opcode = match (op, kind) {
        (PseudoOp::Add, Int) => OpCode::IAdd,
        (PseudoOp::Add, Uint) => OpCode::UAdd,
        (PseudoOp::Add, Double) => OpCode::DAdd,
        (PseudoOp::Subtract, Int) => OpCode::ISub,
        (PseudoOp::Subtract, Uint) => OpCode::USub,
        (PseudoOp::Subtract, Double) => OpCode::DSub,
        (PseudoOp::Multiply, Int) => OpCode::IMul,
        (PseudoOp::Multiply, Uint) => OpCode::UMul,
        (PseudoOp::Multiply, Double) => OpCode::DMul,
        (PseudoOp::Divide, Int) => OpCode::IDiv,
        (PseudoOp::Divide, Uint) => OpCode::UDiv,
        (PseudoOp::Divide, Double) => OpCode::DDiv,
        (PseudoOp::Mod, Int) => OpCode::IMod,
        (PseudoOp::Mod, Uint) => OpCode::UMod,
        _ => return None,
    };
    Some(opcode)
}

/// Flag bits that make a comparison true.
fn compare_mask(op: &PseudoOp) -> Option<u32> {
    let mask = match op {
        PseudoOp::Equal => flags::EQUAL,
        PseudoOp::NotEqual => flags::NOT_EQUAL,
        PseudoOp::Greater => flags::GREATER,
        PseudoOp::Less => flags::LESS,
        PseudoOp::GreaterEqual => flags::EQUAL | flags::GREATER,
        PseudoOp::LessEqual => flags::EQUAL | flags::LESS,
        _ => return None,
    };
    Some(mask)
}

fn logic_opcode(op: &PseudoOp) -> Option<OpCode> {
    let opcode = match op {
        PseudoOp::BitOr => OpCode::BitOr,
        PseudoOp::BitAnd => OpCode::BitAnd,
        PseudoOp::ShiftLeft => OpCode::BitShiftLeft,
        PseudoOp::ShiftRight => OpCode::BitShiftRight,
        PseudoOp::And => OpCode::And,
        PseudoOp::Or => OpCode::Or,
        _ => return None,
    };
    Some(opcode)
}

impl<'s> ByteLowerer<'s> {
    /// Pop right then left.
    fn operands(&mut self) -> Result<(Value, Value), Diagnostic> {
        let right = self.pop_value()?;
        match self.pop_value() {
            Ok(left) => Ok((left, right)),
            Err(err) => {
                self.release(&right);
                Err(err)
            }
        }
    }

    fn reject(&mut self, left: &Value, right: &Value, err: Diagnostic) -> Result<(), Diagnostic> {
        self.release(left);
        self.release(right);
        Err(err)
    }

    /// Emit `opcode dst, left, right` on operands already of one kind and
    /// push the result.
    fn finish_binary(
        &mut self,
        opcode: OpCode,
        left: Value,
        right: Value,
        result_kind: NumericKind,
    ) -> Result<(), Diagnostic> {
        let destination = self.writable(&left)?;
        self.emit(Instruction::new(
            opcode,
            destination as u64,
            left.register as u64,
            right.register as u64,
        ));
        self.release(&right);
        self.values.push(Value {
            register: destination,
            kind: result_kind,
            origin: Origin::Result,
        });
        Ok(())
    }

    pub(super) fn arithmetic(&mut self, op: &PseudoOp) -> Result<(), Diagnostic> {
        let (left, right) = self.operands()?;
        let kind = left.kind.common(right.kind);
        let Some(opcode) = arithmetic_opcode(op, kind) else {
            let err = self.type_error(format!("{} is not defined for {}", op.name(), kind.name()));
            return self.reject(&left, &right, err);
        };
        let left = self.coerce(left, kind)?;
        let right = self.coerce(right, kind)?;
        self.finish_binary(opcode, left, right, kind)
    }

    pub(super) fn negate(&mut self) -> Result<(), Diagnostic> {
        let value = self.pop_value()?;
        let value = match value.kind {
            NumericKind::Uint => self.coerce(value, NumericKind::Int)?,
            _ => value,
        };
        let opcode = match value.kind {
            NumericKind::Double => OpCode::DNeg,
            _ => OpCode::INeg,
        };
        self.unary(opcode, value.kind, value)
    }

    fn unary(
        &mut self,
        opcode: OpCode,
        result_kind: NumericKind,
        value: Value,
    ) -> Result<(), Diagnostic> {
        let destination = self.writable(&value)?;
        self.emit(Instruction::new(
            opcode,
            destination as u64,
            value.register as u64,
            0,
        ));
        self.values.push(Value {
            register: destination,
            kind: result_kind,
            origin: Origin::Result,
        });
        Ok(())
    }

    /// `&&` and `||`: truthiness of the raw bits, result 0 or 1.
    pub(super) fn logical(&mut self, op: &PseudoOp) -> Result<(), Diagnostic> {
        let (left, right) = self.operands()?;
        let Some(opcode) = logic_opcode(op) else {
            let err = self.logic(format!("{} is not a logical operation", op.name()));
            return self.reject(&left, &right, err);
        };
        self.finish_binary(opcode, left, right, NumericKind::Uint)
    }

    pub(super) fn not(&mut self) -> Result<(), Diagnostic> {
        let value = self.pop_value()?;
        self.unary(OpCode::Not, NumericKind::Uint, value)
    }

    pub(super) fn bitwise(&mut self, op: &PseudoOp) -> Result<(), Diagnostic> {
        let (left, right) = self.operands()?;
        let kind = left.kind.common(right.kind);
        if !kind.is_integer() {
            let err = self.type_error(format!("{} needs integer operands", op.name()));
            return self.reject(&left, &right, err);
        }
        let Some(opcode) = logic_opcode(op) else {
            let err = self.logic(format!("{} is not a bitwise operation", op.name()));
            return self.reject(&left, &right, err);
        };
        let left = self.coerce(left, kind)?;
        let right = self.coerce(right, kind)?;
        self.finish_binary(opcode, left, right, NumericKind::Uint)
    }

    pub(super) fn bit_not(&mut self) -> Result<(), Diagnostic> {
        let value = self.pop_value()?;
        if !value.kind.is_integer() {
            self.release(&value);
            return Err(self.type_error("BitNot needs an integer operand"));
        }
        self.unary(OpCode::BitNot, NumericKind::Uint, value)
    }

    /// Compare, then pull the matching flags into a 0/1 result.
    pub(super) fn compare(&mut self, op: &PseudoOp) -> Result<(), Diagnostic> {
        let (left, right) = self.operands()?;
        let Some(mask) = compare_mask(op) else {
            let err = self.logic(format!("{} is not a comparison", op.name()));
            return self.reject(&left, &right, err);
        };
        let kind = left.kind.common(right.kind);
        let left = self.coerce(left, kind)?;
        let right = self.coerce(right, kind)?;
        let compare = match kind {
            NumericKind::Double => OpCode::DCmp,
            _ => OpCode::Cmp,
        };
        self.emit(Instruction::new(
            compare,
            0,
            left.register as u64,
            right.register as u64,
        ));
        let destination = self.writable(&left)?;
        self.emit(Instruction::new(
            OpCode::GetFlag,
            destination as u64,
            u64::from(mask),
            0,
        ));
        self.release(&right);
        self.values.push(Value {
            register: destination,
            kind: NumericKind::Uint,
            origin: Origin::Result,
        });
        Ok(())
    }
}
