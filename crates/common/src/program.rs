//! Program representation: the machine-instruction array the VM consumes.
//!
//! Programs live in memory only. The assembler provides a text form.

use crate::instruction::Instruction;

/// A Malachite machine program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// The instruction stream, indexed by instruction pointer.
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Create a new program from a vector of instructions.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Number of instructions in the program.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction at `ip`, if any.
    pub fn get(&self, ip: usize) -> Option<&Instruction> {
        self.instructions.get(ip)
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}
