//! System call numbers for `OP_SYSTEM_CALL`.

use crate::error::DecodeError;

/// A system call, selected by the destination operand.
#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysCall {
    /// Print source0 as a signed integer.
    PrintInt = 0,
    /// Print source0 as an unsigned integer.
    PrintUint = 1,
    /// Print source0 as a double.
    PrintDouble = 2,
    /// Print the low byte of source0 as a character.
    PrintChar = 3,
    /// Print `len` bytes of memory starting at `ptr`, then a newline.
    /// Both are read from registers: source0 holds ptr, source1 holds len.
    PrintCharArray = 4,
}

/// All system calls, in numeric order.
pub const ALL_SYSCALLS: [SysCall; 5] = [
    SysCall::PrintInt,
    SysCall::PrintUint,
    SysCall::PrintDouble,
    SysCall::PrintChar,
    SysCall::PrintCharArray,
];

impl TryFrom<u64> for SysCall {
    type Error = DecodeError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        ALL_SYSCALLS
            .iter()
            .find(|call| **call as u64 == value)
            .copied()
            .ok_or(DecodeError::UnknownSyscall(value))
    }
}

impl SysCall {
    /// The constant name used in opcode blocks and assembly text.
    pub fn name(&self) -> &'static str {
        match self {
            SysCall::PrintInt => "PRINT_INT",
            SysCall::PrintUint => "PRINT_UINT",
            SysCall::PrintDouble => "PRINT_DOUBLE",
            SysCall::PrintChar => "PRINT_CHAR",
            SysCall::PrintCharArray => "PRINT_CHAR_ARRAY",
        }
    }

    /// Look up a system call by constant name.
    pub fn from_name(name: &str) -> Option<SysCall> {
        ALL_SYSCALLS.iter().find(|call| call.name() == name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for call in ALL_SYSCALLS {
            assert_eq!(SysCall::from_name(call.name()), Some(call));
            assert_eq!(SysCall::try_from(call as u64), Ok(call));
        }
    }

    #[test]
    fn unknown_number() {
        assert_eq!(SysCall::try_from(5), Err(DecodeError::UnknownSyscall(5)));
    }
}
