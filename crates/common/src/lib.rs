//! Malachite machine instruction set.
//!
//! This crate provides the data structures shared by the compiler, the
//! assembler and the virtual machine:
//!
//! - [`OpCode`]: the range-grouped opcode set, with mnemonics
//! - [`Cell`]: reinterpreted 64-bit register contents
//! - [`NumericKind`]: INT / UINT / DOUBLE and the conversion table
//! - [`Instruction`]: opcode, three operand slots, one immediate
//! - [`Program`]: the instruction array
//! - [`SysCall`] and [`flags`]: syscall numbers and flag bits
//! - [`DecodeError`]: errors from decoding raw numbers

pub mod cell;
pub mod error;
pub mod flags;
pub mod instruction;
pub mod kind;
pub mod limits;
pub mod opcode;
pub mod program;
pub mod syscall;

// Re-export commonly used types at the crate root.
pub use cell::Cell;
pub use error::DecodeError;
pub use instruction::Instruction;
pub use kind::NumericKind;
pub use opcode::{Category, OpCode};
pub use program::Program;
pub use syscall::SysCall;
