//! Malachite virtual machine: executes machine programs.
//!
//! The VM is a register machine with:
//! - 255 general-purpose 64-bit registers read as int, uint or double
//! - A flat memory buffer split into a bump heap and a downward stack
//! - A data-frame stack for lexical scopes and a call stack for returns
//!
//! # Usage
//!
//! ```
//! use malachite_common::{Cell, Instruction, OpCode, Program};
//! use malachite_vm::{Termination, VM};
//!
//! let program = Program::new(vec![
//!     Instruction::with_immediate(OpCode::MovRiInt, 0, Cell::from_int(40)),
//!     Instruction::with_immediate(OpCode::MovRiInt, 1, Cell::from_int(2)),
//!     Instruction::new(OpCode::IAdd, 2, 0, 1),
//!     Instruction::bare(OpCode::Halt),
//! ]);
//!
//! let mut vm = VM::new(&program);
//! assert_eq!(vm.execute(), Ok(Termination::Halted { at: 3 }));
//! assert_eq!(vm.register(2).map(|c| c.as_int()), Some(42));
//! ```

pub mod config;
pub mod error;
pub mod execute;
pub mod machine;

pub use config::VmConfig;
pub use error::{ConfigError, ErrorKind, Fault};
pub use machine::{DataFrame, Termination, VM};

use malachite_common::Program;

/// Execute a program with the default configuration, printing to stdout.
///
/// # Errors
///
/// Returns the [`Fault`] that stopped execution (division by zero,
/// memory access violation, stack overflow, etc.).
pub fn run(program: &Program) -> Result<Termination, Fault> {
    VM::new(program).execute()
}

/// Execute a program and capture everything it prints.
pub fn run_captured(program: &Program) -> (Result<Termination, Fault>, String) {
    let mut buffer = Vec::new();
    let result = VM::new(program).with_output(&mut buffer).execute();
    (result, String::from_utf8_lossy(&buffer).into_owned())
}
