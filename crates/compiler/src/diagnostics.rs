//! Non-fatal compile diagnostics.
//!
//! Lowering keeps going after a bad statement, so a single compile can
//! surface many problems. Each one is recorded here and mirrored as a
//! `tracing` event.

use std::fmt;

use tracing::{error, info, warn};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    /// Malformed construct shape.
    Syntax,
    /// Undeclared name, const violation or kind mismatch.
    Type,
    /// Unresolved label, exhausted registers, unsupported construct.
    Logic,
    Runtime,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        *self >= Severity::Syntax
    }

    pub fn name(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Syntax => "syntax error",
            Severity::Type => "type error",
            Severity::Logic => "logic error",
            Severity::Runtime => "runtime error",
        }
    }
}

/// One reported problem.
///
/// `line` is a source line during tree lowering and a pseudo-instruction
/// index during byte lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, line: u32, message: impl Into<String>) -> Self {
        Self {
            severity,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}: {}", self.severity.name(), self.line, self.message)
    }
}

/// Collected diagnostics, in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and emit the matching tracing event.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        let line = diagnostic.line;
        match diagnostic.severity {
            Severity::Info => info!(line, "{}", diagnostic.message),
            Severity::Warning => warn!(line, "{}", diagnostic.message),
            severity => error!(line, kind = severity.name(), "{}", diagnostic.message),
        }
        self.entries.push(diagnostic);
    }

    pub fn info(&mut self, line: u32, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Info, line, message));
    }

    pub fn warning(&mut self, line: u32, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Warning, line, message));
    }

    pub fn syntax(&mut self, line: u32, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Syntax, line, message));
    }

    pub fn type_error(&mut self, line: u32, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Type, line, message));
    }

    pub fn logic(&mut self, line: u32, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Logic, line, message));
    }

    /// True if anything worse than a warning was reported.
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity.is_error())
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
