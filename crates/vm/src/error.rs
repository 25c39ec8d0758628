//! Runtime errors for the Malachite VM.
//!
//! Handlers report a bare [`ErrorKind`]; the dispatch loop attaches the
//! faulting instruction pointer and records the resulting [`Fault`] on the
//! bounded error stack.

use thiserror::Error;

/// What went wrong, without the location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    /// Nothing to execute.
    #[error("invalid program")]
    InvalidProgram,

    /// Integer or double division (or remainder) by zero.
    #[error("division by zero")]
    ZeroDivision,

    /// A double compare saw a NaN operand.
    #[error("NaN operand in double compare")]
    NanFloatValue,

    /// Address range outside the memory region the instruction may touch,
    /// or a transfer size outside 1..=8.
    #[error("memory access violation")]
    MemoryAccessViolation,

    /// Stack region, call stack or data-frame stack exhausted.
    #[error("stack overflow")]
    StackOverflow,

    /// Pop, return or frame access with nothing to pop or address.
    #[error("stack underflow")]
    StackUnderflow,

    /// Register operand beyond the register file.
    #[error("invalid register")]
    InvalidRegister,

    /// Unknown system call number.
    #[error("invalid system call")]
    InvalidSyscall,

    /// The output stream rejected a write.
    #[error("output write failed")]
    OutputFailed,
}

impl ErrorKind {
    /// Stable numeric code. 0 means no error and 1 a clean exit; neither
    /// is an `ErrorKind`.
    pub fn code(&self) -> u8 {
        match self {
            ErrorKind::InvalidProgram => 3,
            ErrorKind::ZeroDivision => 4,
            ErrorKind::NanFloatValue => 5,
            ErrorKind::MemoryAccessViolation => 6,
            ErrorKind::StackOverflow => 7,
            ErrorKind::StackUnderflow => 8,
            ErrorKind::InvalidRegister => 9,
            ErrorKind::InvalidSyscall => 10,
            ErrorKind::OutputFailed => 11,
        }
    }
}

/// An error kind together with the faulting instruction pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at instruction {ip}")]
pub struct Fault {
    pub kind: ErrorKind,
    pub ip: usize,
}

/// Rejected [`crate::VmConfig`] values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The heap must leave room for a stack region.
    #[error("heap size {heap} must be smaller than memory size {memory}")]
    HeapTooLarge { heap: usize, memory: usize },

    /// A capacity was configured as zero.
    #[error("{0} must be non-zero")]
    ZeroCapacity(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_display() {
        let fault = Fault {
            kind: ErrorKind::ZeroDivision,
            ip: 5,
        };
        assert_eq!(fault.to_string(), "division by zero at instruction 5");
    }

    #[test]
    fn codes_are_unique() {
        let kinds = [
            ErrorKind::InvalidProgram,
            ErrorKind::ZeroDivision,
            ErrorKind::NanFloatValue,
            ErrorKind::MemoryAccessViolation,
            ErrorKind::StackOverflow,
            ErrorKind::StackUnderflow,
            ErrorKind::InvalidRegister,
            ErrorKind::InvalidSyscall,
            ErrorKind::OutputFailed,
        ];
        let mut codes: Vec<u8> = kinds.iter().map(ErrorKind::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert!(codes.iter().all(|c| *c > 1));
    }

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConfigError::HeapTooLarge {
                heap: 10,
                memory: 10
            }
            .to_string(),
            "heap size 10 must be smaller than memory size 10"
        );
        assert_eq!(
            ConfigError::ZeroCapacity("call stack").to_string(),
            "call stack must be non-zero"
        );
    }
}
