//! Operand layout per opcode, shared by the parser and the disassembler.
//!
//! Text operands are positional. Most opcodes read them as
//! `dst, src0, src1, imm`; the move-immediate opcodes put the immediate
//! second (`OP_MOV_RI_INT r0, 42`) so the common case stays short.

use malachite_common::OpCode;

/// Which instruction field a text operand fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Destination,
    Source0,
    Source1,
    Immediate,
}

/// How a non-immediate field is written canonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    /// Plain number: offsets, sizes, targets.
    Value,
    /// `r<N>`.
    Register,
    /// System call name when the number has one.
    SysCall,
    /// Compare-flag name when the mask is a single named flag.
    FlagMask,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    pub order: [Field; 4],
    /// Leading operands always written, even when zero.
    pub arity: usize,
    /// Roles of destination, source0 and source1.
    pub roles: [Role; 3],
}

const STANDARD: [Field; 4] = [
    Field::Destination,
    Field::Source0,
    Field::Source1,
    Field::Immediate,
];

const IMMEDIATE_SECOND: [Field; 4] = [
    Field::Destination,
    Field::Immediate,
    Field::Source0,
    Field::Source1,
];

pub(crate) fn layout(opcode: OpCode) -> Layout {
    use Role::{FlagMask, Register as R, SysCall, Value as V};

    let (arity, roles) = match opcode {
        OpCode::Nop | OpCode::CreateFrame | OpCode::DestroyFrame | OpCode::Ret | OpCode::Halt => {
            (0, [V, V, V])
        }

        OpCode::IAdd
        | OpCode::ISub
        | OpCode::IMul
        | OpCode::IDiv
        | OpCode::IMod
        | OpCode::UAdd
        | OpCode::USub
        | OpCode::UMul
        | OpCode::UDiv
        | OpCode::UMod
        | OpCode::DAdd
        | OpCode::DSub
        | OpCode::DMul
        | OpCode::DDiv
        | OpCode::And
        | OpCode::Or
        | OpCode::BitOr
        | OpCode::BitAnd
        | OpCode::BitShiftLeft
        | OpCode::BitShiftRight => (3, [R, R, R]),

        OpCode::INeg | OpCode::DNeg | OpCode::Not | OpCode::BitNot | OpCode::MovRr => {
            (2, [R, R, V])
        }
        OpCode::Cmp | OpCode::DCmp => (3, [V, R, R]),
        OpCode::GetFlag => (2, [R, FlagMask, V]),

        OpCode::MovRiInt | OpCode::MovRiUint | OpCode::MovRiDouble => (2, [R, V, V]),
        OpCode::LoadRm => (3, [R, V, V]),
        OpCode::StoreMr => (3, [V, R, V]),
        OpCode::Push | OpCode::Pop | OpCode::DestroyFrames => (1, [V, V, V]),
        OpCode::LoadLocal | OpCode::LoadEnclosingA | OpCode::LoadEnclosingR => (3, [R, V, V]),
        OpCode::StoreLocal | OpCode::StoreEnclosingA | OpCode::StoreEnclosingR => (3, [V, R, V]),
        OpCode::AllocateMemory => (2, [R, R, V]),
        OpCode::FreeMemory => (3, [V, R, R]),

        OpCode::Jmp | OpCode::Call => (1, [V, V, V]),
        OpCode::JmpCv | OpCode::JmpCnv => (2, [V, R, V]),

        OpCode::SystemCall => (2, [SysCall, R, R]),

        OpCode::TcItd
        | OpCode::TcDti
        | OpCode::TcUitd
        | OpCode::TcUiti
        | OpCode::TcDtui
        | OpCode::TcItui => (1, [R, V, V]),
    };

    let order = match opcode {
        OpCode::MovRiInt | OpCode::MovRiUint | OpCode::MovRiDouble => IMMEDIATE_SECOND,
        _ => STANDARD,
    };

    Layout {
        order,
        arity,
        roles,
    }
}

impl Layout {
    pub(crate) fn role(&self, field: Field) -> Role {
        match field {
            Field::Destination => self.roles[0],
            Field::Source0 => self.roles[1],
            Field::Source1 => self.roles[2],
            Field::Immediate => Role::Value,
        }
    }
}
