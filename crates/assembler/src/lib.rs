//! Malachite assembler: text listing to program and back.
//!
//! The translation is mechanical, one line per instruction. Operands are
//! positional and commas between them are optional.
//!
//! # Usage
//!
//! ```
//! use malachite_assembler::{assemble, disassemble};
//!
//! let text = "OP_MOV_RI_INT r0, 42\nOP_SYSTEM_CALL PRINT_INT, r0\nOP_HALT\n";
//! let program = assemble(text).unwrap();
//! assert_eq!(disassemble(&program), text);
//! ```
//!
//! # Roundtrip Guarantee
//!
//! `assemble(disassemble(program)) == program` holds for every program.
//! The disassembler writes canonical text; the assembler also accepts
//! plain numbers for registers, hex for any field, and char literals.

pub mod error;

mod disassembler;
mod layout;
mod lexer;
mod parser;

pub use error::AsmError;

use lexer::tokenize_line;
use malachite_common::Program;
use parser::parse_line;

/// Assemble text into a program.
///
/// Returns the first error encountered.
pub fn assemble(text: &str) -> Result<Program, AsmError> {
    let mut instructions = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        let tokens = tokenize_line(line, line_num)?;
        if let Some(instruction) = parse_line(&tokens, line_num)? {
            instructions.push(instruction);
        }
    }

    Ok(Program::new(instructions))
}

/// Disassemble a program into canonical assembly text.
pub fn disassemble(program: &Program) -> String {
    disassembler::disassemble(program)
}
