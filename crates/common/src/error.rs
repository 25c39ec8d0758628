//! Decode errors for raw machine values.

use thiserror::Error;

/// Errors that occur when a raw number does not name a known machine item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Opcode number outside every defined range, or a gap inside a range.
    #[error("unknown opcode: {0}")]
    UnknownOpcode(u16),

    /// Numeric kind tag not in 0..=2.
    #[error("unknown numeric kind: {0}")]
    UnknownNumericKind(u8),

    /// System call number not defined.
    #[error("unknown system call: {0}")]
    UnknownSyscall(u64),
}
