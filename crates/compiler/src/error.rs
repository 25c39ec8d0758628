//! Compiler errors.
//!
//! Most problems are reported as [`Diagnostic`](crate::Diagnostic)s and
//! lowering continues. The types here cover the few conditions that stop a
//! compile or a single state operation.

use std::fmt;

use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::pseudo::SignalKind;
use crate::state::LabelId;

/// Failures of a single [`CompilationState`](crate::CompilationState) operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("\"{name}\" is already declared in this scope")]
    Redeclared { name: String },

    #[error("the global scope cannot be closed")]
    GlobalScope,
}

/// Expression shapes the postfix converter rejects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("unexpected token \"{0}\" in expression")]
    UnexpectedToken(String),

    #[error("',' outside of a call argument list")]
    MisplacedComma,

    #[error("empty expression")]
    Empty,
}

/// A jump whose label was never placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingJump {
    pub label: LabelId,
    /// Index of the jump in the pseudo stream.
    pub pseudo_ip: usize,
    /// Index of the emitted machine instruction.
    pub machine_ip: usize,
}

impl fmt::Display for PendingJump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "label {} (pseudo {}, machine {})",
            self.label, self.pseudo_ip, self.machine_ip
        )
    }
}

/// Conditions that stop byte lowering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("unresolved jumps: {}", list_jumps(.0))]
    UnresolvedJumps(Vec<PendingJump>),

    #[error("{kind} signal at pseudo instruction {ip} was not rewritten by a loop")]
    UnrewrittenSignal { ip: usize, kind: SignalKind },
}

fn list_jumps(jumps: &[PendingJump]) -> String {
    jumps
        .iter()
        .map(PendingJump::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A fatal compile failure, with everything reported before it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source}")]
pub struct CompileError {
    #[source]
    pub source: LowerError,
    pub diagnostics: Diagnostics,
}
