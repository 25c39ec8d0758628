//! Machine instructions.
//!
//! Every instruction has the same shape: an opcode, three 64-bit operand
//! slots and one immediate cell. Which slots are registers, offsets, sizes
//! or jump targets depends on the opcode.

use crate::cell::Cell;
use crate::opcode::OpCode;

/// A single machine instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The operation to perform.
    pub opcode: OpCode,
    /// Destination register, address, offset, size, syscall number or jump target.
    pub destination: u64,
    /// First source operand.
    pub source0: u64,
    /// Second source operand.
    pub source1: u64,
    /// Raw immediate, read according to [`OpCode::immediate_kind`].
    pub immediate: Cell,
}

impl Instruction {
    /// Create an instruction with three operands and a zero immediate.
    pub fn new(opcode: OpCode, destination: u64, source0: u64, source1: u64) -> Self {
        Self {
            opcode,
            destination,
            source0,
            source1,
            immediate: Cell::ZERO,
        }
    }

    /// Create an operand-less instruction.
    pub fn bare(opcode: OpCode) -> Self {
        Self::new(opcode, 0, 0, 0)
    }

    /// Create a destination + immediate instruction (the `MOV_RI` family).
    pub fn with_immediate(opcode: OpCode, destination: u64, immediate: Cell) -> Self {
        Self {
            opcode,
            destination,
            source0: 0,
            source1: 0,
            immediate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_zeroes_immediate() {
        let instr = Instruction::new(OpCode::IAdd, 2, 0, 1);
        assert_eq!(instr.immediate, Cell::ZERO);
        assert_eq!((instr.destination, instr.source0, instr.source1), (2, 0, 1));
    }

    #[test]
    fn with_immediate_sets_only_destination() {
        let instr = Instruction::with_immediate(OpCode::MovRiInt, 3, Cell::from_int(-1));
        assert_eq!(instr.destination, 3);
        assert_eq!(instr.source0, 0);
        assert_eq!(instr.immediate.as_int(), -1);
    }
}
