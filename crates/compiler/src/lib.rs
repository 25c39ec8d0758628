//! Malachite compiler back end.
//!
//! Takes a syntax tree from an external front end through two stages:
//!
//! - **Tree lowering** ([`Lowerer`]): expressions, statements, loops and
//!   opcode blocks become a [`PseudoOp`] stream with symbolic labels.
//! - **Byte lowering** ([`bytecode::lower`]): register allocation, frame
//!   layout and label patching produce a [`Program`].
//!
//! Problems are collected as [`Diagnostics`] and lowering continues past
//! them. Only the conditions in [`LowerError`] stop a compile.
//!
//! ```
//! use malachite_compiler::{compile, Literal, Node, Operator, Token};
//!
//! let root = Node::root(vec![Node::leaf(vec![
//!     Token::type_marker("int", 1),
//!     Token::identifier("x", 1),
//!     Token::operator(Operator::Assign, 1),
//!     Token::literal(Literal::Int(41), 1),
//!     Token::operator(Operator::Add, 1),
//!     Token::literal(Literal::Int(1), 1),
//! ])]);
//! let compilation = compile(&root).unwrap();
//! assert!(compilation.diagnostics.is_empty());
//! ```

pub mod bytecode;
pub mod diagnostics;
pub mod error;
pub mod expression;
pub mod opcode_block;
pub mod pseudo;
pub mod state;
pub mod statement;
pub mod syntax;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{CompileError, ExpressionError, LowerError, PendingJump, StateError};
pub use pseudo::{listing, PseudoOp, SignalKind};
pub use state::CompilationState;
pub use statement::Lowerer;
pub use syntax::{CompilerLabel, Keyword, Literal, Node, Operator, ScopeWrap, Token, TokenKind};

use malachite_common::Program;
use tracing::debug;

/// Everything a successful compile produces.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub pseudo: Vec<PseudoOp>,
    pub program: Program,
    pub diagnostics: Diagnostics,
    pub state: CompilationState,
}

/// Lower a syntax tree to pseudo ops only.
pub fn lower_tree(root: &Node) -> (Vec<PseudoOp>, CompilationState, Diagnostics) {
    let mut state = CompilationState::new();
    let mut diagnostics = Diagnostics::new();
    let pseudo = Lowerer::new(&mut state, &mut diagnostics).lower_program(root);
    (pseudo, state, diagnostics)
}

/// Compile a syntax tree to a machine program.
pub fn compile(root: &Node) -> Result<Compilation, CompileError> {
    let (pseudo, state, mut diagnostics) = lower_tree(root);
    debug!(ops = pseudo.len(), "tree lowering finished");
    match bytecode::lower(&state, &pseudo, &mut diagnostics) {
        Ok(program) => Ok(Compilation {
            pseudo,
            program,
            diagnostics,
            state,
        }),
        Err(source) => Err(CompileError {
            source,
            diagnostics,
        }),
    }
}
