//! Error types for the Malachite assembler.

use thiserror::Error;

/// Errors produced while assembling text into a program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// The first word of a line is not a known mnemonic.
    #[error("line {line}: unknown opcode '{token}'")]
    UnknownOpcode { line: usize, token: String },

    /// A numeric literal could not be parsed, is out of range, or does not
    /// fit the slot it was written in.
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    /// More than four operands after the mnemonic.
    #[error("line {line}: {opcode} takes at most 4 operands, got {count}")]
    TooManyOperands {
        line: usize,
        opcode: &'static str,
        count: usize,
    },

    /// A token appeared where it was not expected.
    #[error("line {line}: unexpected token '{token}'")]
    UnexpectedToken { line: usize, token: String },
}

impl AsmError {
    /// The 1-based source line the error refers to.
    pub fn line(&self) -> usize {
        match self {
            AsmError::UnknownOpcode { line, .. }
            | AsmError::InvalidNumber { line, .. }
            | AsmError::TooManyOperands { line, .. }
            | AsmError::UnexpectedToken { line, .. } => *line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unknown_opcode() {
        let e = AsmError::UnknownOpcode {
            line: 3,
            token: "OP_FOO".to_string(),
        };
        assert_eq!(e.to_string(), "line 3: unknown opcode 'OP_FOO'");
    }

    #[test]
    fn error_display_too_many_operands() {
        let e = AsmError::TooManyOperands {
            line: 7,
            opcode: "OP_HALT",
            count: 5,
        };
        assert_eq!(e.to_string(), "line 7: OP_HALT takes at most 4 operands, got 5");
    }

    #[test]
    fn error_display_invalid_number() {
        let e = AsmError::InvalidNumber {
            line: 2,
            token: "0xZZZZ".to_string(),
        };
        assert_eq!(e.to_string(), "line 2: invalid number '0xZZZZ'");
    }

    #[test]
    fn line_accessor() {
        let e = AsmError::UnexpectedToken {
            line: 4,
            token: "?".to_string(),
        };
        assert_eq!(e.line(), 4);
    }
}
