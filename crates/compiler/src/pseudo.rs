//! Pseudo instructions: the interchange format between tree lowering and
//! byte lowering.
//!
//! Operands are typed payloads rather than a name-keyed map. The `Display`
//! impl renders them as `Name key:value ...`, which is what the listing
//! shows.

use std::fmt;

use malachite_common::{Cell, OpCode};

use crate::state::{FunctionId, LabelId, VariableId};
use crate::syntax::Literal;

/// Which loop exit a `break`/`continue` placeholder asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Break,
    Continue,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignalKind::Break => "break",
            SignalKind::Continue => "continue",
        })
    }
}

/// The role a label plays in the construct that created it. Only used to
/// make listings readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelMark {
    WhileCheck,
    WhileEnd,
    LoopStart,
    LoopEnd,
    ForCheck,
    ForGreater,
    ForBody,
    ForAdd,
    ForEnd,
    NextCondition,
    ChainSkip,
}

/// One of the eight named registers of an opcode block, `RA`..`RH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRegister(pub u8);

impl BlockRegister {
    pub fn from_name(name: &str) -> Option<BlockRegister> {
        match name.as_bytes() {
            [b'R', letter @ b'A'..=b'H'] => Some(BlockRegister(letter - b'A')),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for BlockRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", char::from(b'A' + self.0))
    }
}

/// A destination or source slot of an opcode-block command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOperand {
    Register(BlockRegister),
    /// Raw operand value (a constant or a literal number).
    Value(u64),
}

impl fmt::Display for BlockOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockOperand::Register(r) => write!(f, "{r}"),
            BlockOperand::Value(v) => write!(f, "{v}"),
        }
    }
}

/// What `STORE_VR` writes into the variable.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockSource {
    Register(BlockRegister),
    Literal(Literal),
}

impl fmt::Display for BlockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockSource::Register(r) => write!(f, "{r}"),
            BlockSource::Literal(lit) => write!(f, "{lit:?}"),
        }
    }
}

/// An abstract operation, one level above machine instructions.
#[derive(Debug, Clone, PartialEq)]
pub enum PseudoOp {
    Nop,

    // Values and storage
    Immediate(Literal),
    /// Pass the top value as a call argument.
    Push,
    /// Discard the top value.
    Pop,
    Load(VariableId),
    Store(VariableId),

    // Scopes and declarations
    ScopeStart,
    ScopeEnd,
    /// Unwind this many scopes at once without leaving the static scope.
    CloseScopes(u64),
    Label { id: LabelId, mark: LabelMark },
    DeclareVariable(VariableId),

    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    Negate,

    // Logic and comparison
    And,
    Or,
    Not,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    BitOr,
    BitNot,
    BitAnd,
    ShiftLeft,
    ShiftRight,

    // Control flow
    Jump(LabelId),
    JumpIf(LabelId),
    JumpNotIf(LabelId),
    Call(FunctionId),
    /// `break`/`continue` placeholder; the enclosing loop must rewrite it.
    Signal { kind: SignalKind, unwind: u64 },

    // Long-lived registers
    SavePseudonym(String),
    LoadPseudonym(String),
    ReleasePseudonym(String),

    // Opcode blocks
    OpCodeStart,
    OpCodeEnd,
    OpCodeStoreVR {
        variable: VariableId,
        source: BlockSource,
    },
    OpCodeLoadRV {
        register: BlockRegister,
        variable: VariableId,
    },
    OpCodeCommand {
        opcode: OpCode,
        destination: BlockOperand,
        source0: BlockOperand,
        source1: BlockOperand,
        immediate: Cell,
    },
}

impl PseudoOp {
    /// Operation name without operands.
    pub fn name(&self) -> &'static str {
        match self {
            PseudoOp::Nop => "Nop",
            PseudoOp::Immediate(_) => "Immediate",
            PseudoOp::Push => "Push",
            PseudoOp::Pop => "Pop",
            PseudoOp::Load(_) => "Load",
            PseudoOp::Store(_) => "Store",
            PseudoOp::ScopeStart => "ScopeStart",
            PseudoOp::ScopeEnd => "ScopeEnd",
            PseudoOp::CloseScopes(_) => "CloseScopes",
            PseudoOp::Label { .. } => "Label",
            PseudoOp::DeclareVariable(_) => "DeclareVariable",
            PseudoOp::Add => "Add",
            PseudoOp::Subtract => "Subtract",
            PseudoOp::Multiply => "Multiply",
            PseudoOp::Divide => "Divide",
            PseudoOp::Mod => "Mod",
            PseudoOp::Negate => "Negate",
            PseudoOp::And => "And",
            PseudoOp::Or => "Or",
            PseudoOp::Not => "Not",
            PseudoOp::Equal => "Equal",
            PseudoOp::NotEqual => "NotEqual",
            PseudoOp::Greater => "Greater",
            PseudoOp::Less => "Less",
            PseudoOp::GreaterEqual => "GreaterEqual",
            PseudoOp::LessEqual => "LessEqual",
            PseudoOp::BitOr => "BitOr",
            PseudoOp::BitNot => "BitNot",
            PseudoOp::BitAnd => "BitAnd",
            PseudoOp::ShiftLeft => "ShiftLeft",
            PseudoOp::ShiftRight => "ShiftRight",
            PseudoOp::Jump(_) => "Jump",
            PseudoOp::JumpIf(_) => "JumpIf",
            PseudoOp::JumpNotIf(_) => "JumpNotIf",
            PseudoOp::Call(_) => "Call",
            PseudoOp::Signal { .. } => "Signal",
            PseudoOp::SavePseudonym(_) => "SavePseudonym",
            PseudoOp::LoadPseudonym(_) => "LoadPseudonym",
            PseudoOp::ReleasePseudonym(_) => "ReleasePseudonym",
            PseudoOp::OpCodeStart => "OpCodeStart",
            PseudoOp::OpCodeEnd => "OpCodeEnd",
            PseudoOp::OpCodeStoreVR { .. } => "OpCodeStoreVR",
            PseudoOp::OpCodeLoadRV { .. } => "OpCodeLoadRV",
            PseudoOp::OpCodeCommand { .. } => "OpCodeCommand",
        }
    }

    /// The label a jump targets.
    pub fn jump_target(&self) -> Option<LabelId> {
        match self {
            PseudoOp::Jump(l) | PseudoOp::JumpIf(l) | PseudoOp::JumpNotIf(l) => Some(*l),
            _ => None,
        }
    }
}

impl fmt::Display for PseudoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        match self {
            PseudoOp::Immediate(lit) => write!(f, " value:{lit:?}"),
            PseudoOp::Load(v) | PseudoOp::Store(v) | PseudoOp::DeclareVariable(v) => {
                write!(f, " variable:{v}")
            }
            PseudoOp::CloseScopes(n) => write!(f, " count:{n}"),
            PseudoOp::Label { id, mark } => write!(f, " id:{id} mark:{mark:?}"),
            PseudoOp::Jump(l) | PseudoOp::JumpIf(l) | PseudoOp::JumpNotIf(l) => {
                write!(f, " label:{l}")
            }
            PseudoOp::Call(id) => write!(f, " function:{id}"),
            PseudoOp::Signal { kind, unwind } => write!(f, " kind:{kind} unwind:{unwind}"),
            PseudoOp::SavePseudonym(name)
            | PseudoOp::LoadPseudonym(name)
            | PseudoOp::ReleasePseudonym(name) => write!(f, " name:{name}"),
            PseudoOp::OpCodeStoreVR { variable, source } => {
                write!(f, " variable:{variable} source:{source}")
            }
            PseudoOp::OpCodeLoadRV { register, variable } => {
                write!(f, " register:{register} variable:{variable}")
            }
            PseudoOp::OpCodeCommand {
                opcode,
                destination,
                source0,
                source1,
                immediate,
            } => write!(
                f,
                " opcode:{} destination:{destination} source0:{source0} source1:{source1} immediate:{}",
                opcode.mnemonic(),
                immediate.bits()
            ),
            _ => Ok(()),
        }
    }
}

/// Render a pseudo stream, one numbered op per line, indented by scope.
pub fn listing(ops: &[PseudoOp]) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for (ip, op) in ops.iter().enumerate() {
        if matches!(op, PseudoOp::ScopeEnd | PseudoOp::OpCodeEnd) {
            depth = depth.saturating_sub(1);
        }
        let indent = "  ".repeat(depth);
        out.push_str(&format!("{ip:>4}  {indent}{op}\n"));
        if matches!(op, PseudoOp::ScopeStart | PseudoOp::OpCodeStart) {
            depth += 1;
        }
    }
    out
}
