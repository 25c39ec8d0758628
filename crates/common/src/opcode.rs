//! Opcode definitions for the Malachite register machine.
//!
//! Opcodes are grouped into numeric ranges. The VM dispatches on the range
//! first and on the exact opcode second, so the numbering is part of the
//! instruction set, not an implementation detail.

use crate::error::DecodeError;
use crate::kind::NumericKind;

/// The numeric range an opcode belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Opcode 0.
    Nop,
    /// Opcodes 1..=30.
    Arithmetic,
    /// Opcodes 31..=60.
    Logic,
    /// Opcodes 61..=80.
    Memory,
    /// Opcodes 91..=120.
    ControlFlow,
    /// Opcode 121.
    SystemCall,
    /// Opcodes 122..=127.
    Conversion,
}

/// Identifies the operation a machine instruction performs.
///
/// Operand naming follows the suffix of the mnemonic: `RRR` reads two source
/// registers and writes the destination register, `RR` reads one, `R` works
/// in place on the destination.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// No operation.
    Nop = 0,

    // Arithmetic [1-30]
    /// Signed add, wrapping.
    IAdd = 1,
    /// Signed subtract, wrapping.
    ISub = 2,
    /// Signed multiply, wrapping.
    IMul = 3,
    /// Signed divide. Division by zero is a fault.
    IDiv = 4,
    /// Signed remainder. Division by zero is a fault.
    IMod = 5,
    /// Signed negate.
    INeg = 6,
    /// Unsigned add, wrapping.
    UAdd = 7,
    /// Unsigned subtract, wrapping.
    USub = 8,
    /// Unsigned multiply, wrapping.
    UMul = 9,
    /// Unsigned divide.
    UDiv = 10,
    /// Unsigned remainder.
    UMod = 11,
    /// Double add.
    DAdd = 12,
    /// Double subtract.
    DSub = 13,
    /// Double multiply.
    DMul = 14,
    /// Double divide. Division by 0.0 is a fault.
    DDiv = 15,
    /// Double negate.
    DNeg = 16,

    // Logic [31-60]
    /// Logical and of two registers (0 or 1).
    And = 31,
    /// Logical or of two registers (0 or 1).
    Or = 32,
    /// Logical not.
    Not = 33,
    /// Bitwise or.
    BitOr = 34,
    /// Bitwise not.
    BitNot = 35,
    /// Bitwise and.
    BitAnd = 36,
    /// Shift left by the low 6 bits of source1.
    BitShiftLeft = 37,
    /// Arithmetic shift right by the low 6 bits of source1.
    BitShiftRight = 38,
    /// Signed compare of source0 and source1; sets EQUAL, GREATER or LESS.
    Cmp = 39,
    /// Double compare; NaN operands fault.
    DCmp = 40,
    /// destination = 1 if any flag in the source0 mask is set, else 0.
    GetFlag = 41,

    // Memory [61-80]
    /// Load source1 bytes from absolute address source0.
    LoadRm = 61,
    /// Store source1 bytes of register source0 at absolute address destination.
    StoreMr = 62,
    /// Register copy.
    MovRr = 63,
    /// Move signed immediate.
    MovRiInt = 64,
    /// Move unsigned immediate.
    MovRiUint = 65,
    /// Move double immediate.
    MovRiDouble = 66,
    /// Push (fp, sp) on the data-frame stack and start a new frame.
    CreateFrame = 67,
    /// Restore the (fp, sp) pair saved by the matching CREATE_FRAME.
    DestroyFrame = 68,
    /// Reserve destination bytes of zeroed stack.
    Push = 69,
    /// Release destination bytes of stack.
    Pop = 70,
    /// Load from the current frame.
    LoadLocal = 71,
    /// Store into the current frame.
    StoreLocal = 72,
    /// Store into the frame at an absolute depth.
    StoreEnclosingA = 73,
    /// Load from the frame at an absolute depth.
    LoadEnclosingA = 74,
    /// Store into the frame at a depth relative to the current one.
    StoreEnclosingR = 75,
    /// Load from the frame at a depth relative to the current one.
    LoadEnclosingR = 76,
    /// Bump-allocate heap memory.
    AllocateMemory = 77,
    /// Release the most recent heap allocation.
    FreeMemory = 78,
    /// Destroy `destination` frames at once.
    DestroyFrames = 79,

    // Control flow [91-120]
    /// Unconditional jump.
    Jmp = 91,
    /// Jump if the condition register is non-zero.
    JmpCv = 92,
    /// Jump if the condition register is zero.
    JmpCnv = 93,
    /// Push the return address and jump.
    Call = 94,
    /// Pop the return address and jump to it.
    Ret = 95,
    /// Stop execution; a later run resumes after this instruction.
    Halt = 96,

    // System calls [121]
    /// Invoke the system call numbered by destination.
    SystemCall = 121,

    // Type conversion [122-127]
    /// Signed to double, in place.
    TcItd = 122,
    /// Double to signed, in place.
    TcDti = 123,
    /// Unsigned to double, in place.
    TcUitd = 124,
    /// Unsigned to signed, in place.
    TcUiti = 125,
    /// Double to unsigned, in place.
    TcDtui = 126,
    /// Signed to unsigned, in place.
    TcItui = 127,
}

/// All valid opcodes, in numeric order.
pub const ALL_OPCODES: [OpCode; 60] = [
    OpCode::Nop,
    OpCode::IAdd,
    OpCode::ISub,
    OpCode::IMul,
    OpCode::IDiv,
    OpCode::IMod,
    OpCode::INeg,
    OpCode::UAdd,
    OpCode::USub,
    OpCode::UMul,
    OpCode::UDiv,
    OpCode::UMod,
    OpCode::DAdd,
    OpCode::DSub,
    OpCode::DMul,
    OpCode::DDiv,
    OpCode::DNeg,
    OpCode::And,
    OpCode::Or,
    OpCode::Not,
    OpCode::BitOr,
    OpCode::BitNot,
    OpCode::BitAnd,
    OpCode::BitShiftLeft,
    OpCode::BitShiftRight,
    OpCode::Cmp,
    OpCode::DCmp,
    OpCode::GetFlag,
    OpCode::LoadRm,
    OpCode::StoreMr,
    OpCode::MovRr,
    OpCode::MovRiInt,
    OpCode::MovRiUint,
    OpCode::MovRiDouble,
    OpCode::CreateFrame,
    OpCode::DestroyFrame,
    OpCode::Push,
    OpCode::Pop,
    OpCode::LoadLocal,
    OpCode::StoreLocal,
    OpCode::StoreEnclosingA,
    OpCode::LoadEnclosingA,
    OpCode::StoreEnclosingR,
    OpCode::LoadEnclosingR,
    OpCode::AllocateMemory,
    OpCode::FreeMemory,
    OpCode::DestroyFrames,
    OpCode::Jmp,
    OpCode::JmpCv,
    OpCode::JmpCnv,
    OpCode::Call,
    OpCode::Ret,
    OpCode::Halt,
    OpCode::SystemCall,
    OpCode::TcItd,
    OpCode::TcDti,
    OpCode::TcUitd,
    OpCode::TcUiti,
    OpCode::TcDtui,
    OpCode::TcItui,
];

impl TryFrom<u16> for OpCode {
    type Error = DecodeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ALL_OPCODES
            .iter()
            .find(|op| **op as u16 == value)
            .copied()
            .ok_or(DecodeError::UnknownOpcode(value))
    }
}

impl OpCode {
    /// Returns the range this opcode belongs to.
    pub fn category(&self) -> Category {
        match *self as u16 {
            0 => Category::Nop,
            1..=30 => Category::Arithmetic,
            31..=60 => Category::Logic,
            61..=80 => Category::Memory,
            91..=120 => Category::ControlFlow,
            121 => Category::SystemCall,
            _ => Category::Conversion,
        }
    }

    /// How the immediate cell of this opcode is interpreted.
    pub fn immediate_kind(&self) -> NumericKind {
        match self {
            OpCode::MovRiInt => NumericKind::Int,
            OpCode::MovRiDouble => NumericKind::Double,
            _ => NumericKind::Uint,
        }
    }

    /// Look up an opcode by its assembly mnemonic.
    pub fn from_mnemonic(mnemonic: &str) -> Option<OpCode> {
        ALL_OPCODES
            .iter()
            .find(|op| op.mnemonic() == mnemonic)
            .copied()
    }

    /// Returns the assembly mnemonic for this opcode.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Nop => "OP_NOP",
            OpCode::IAdd => "OP_IADD_RRR",
            OpCode::ISub => "OP_ISUB_RRR",
            OpCode::IMul => "OP_IMUL_RRR",
            OpCode::IDiv => "OP_IDIV_RRR",
            OpCode::IMod => "OP_IMOD_RRR",
            OpCode::INeg => "OP_INEG_RR",
            OpCode::UAdd => "OP_UADD_RRR",
            OpCode::USub => "OP_USUB_RRR",
            OpCode::UMul => "OP_UMUL_RRR",
            OpCode::UDiv => "OP_UDIV_RRR",
            OpCode::UMod => "OP_UMOD_RRR",
            OpCode::DAdd => "OP_DADD_RRR",
            OpCode::DSub => "OP_DSUB_RRR",
            OpCode::DMul => "OP_DMUL_RRR",
            OpCode::DDiv => "OP_DDIV_RRR",
            OpCode::DNeg => "OP_DNEG_RR",
            OpCode::And => "OP_AND_RRR",
            OpCode::Or => "OP_OR_RRR",
            OpCode::Not => "OP_NOT_RR",
            OpCode::BitOr => "OP_BIT_OR_RRR",
            OpCode::BitNot => "OP_BIT_NOT_RR",
            OpCode::BitAnd => "OP_BIT_AND_RRR",
            OpCode::BitShiftLeft => "OP_BIT_OFFSET_LEFT_RRR",
            OpCode::BitShiftRight => "OP_BIT_OFFSET_RIGHT_RRR",
            OpCode::Cmp => "OP_CMP_RR",
            OpCode::DCmp => "OP_DCMP_RR",
            OpCode::GetFlag => "OP_GET_FLAG",
            OpCode::LoadRm => "OP_LOAD_RM",
            OpCode::StoreMr => "OP_STORE_MR",
            OpCode::MovRr => "OP_MOV_RR",
            OpCode::MovRiInt => "OP_MOV_RI_INT",
            OpCode::MovRiUint => "OP_MOV_RI_UINT",
            OpCode::MovRiDouble => "OP_MOV_RI_DOUBLE",
            OpCode::CreateFrame => "OP_CREATE_FRAME",
            OpCode::DestroyFrame => "OP_DESTROY_FRAME",
            OpCode::Push => "OP_PUSH",
            OpCode::Pop => "OP_POP",
            OpCode::LoadLocal => "OP_LOAD_LOCAL",
            OpCode::StoreLocal => "OP_STORE_LOCAL",
            OpCode::StoreEnclosingA => "OP_STORE_ENCLOSING_A",
            OpCode::LoadEnclosingA => "OP_LOAD_ENCLOSING_A",
            OpCode::StoreEnclosingR => "OP_STORE_ENCLOSING_R",
            OpCode::LoadEnclosingR => "OP_LOAD_ENCLOSING_R",
            OpCode::AllocateMemory => "OP_ALLOCATE_MEMORY",
            OpCode::FreeMemory => "OP_FREE_MEMORY",
            OpCode::DestroyFrames => "OP_DESTROY_FRAMES",
            OpCode::Jmp => "OP_JMP",
            OpCode::JmpCv => "OP_JMP_CV",
            OpCode::JmpCnv => "OP_JMP_CNV",
            OpCode::Call => "OP_CALL",
            OpCode::Ret => "OP_RET",
            OpCode::Halt => "OP_HALT",
            OpCode::SystemCall => "OP_SYSTEM_CALL",
            OpCode::TcItd => "OP_TC_ITD_R",
            OpCode::TcDti => "OP_TC_DTI_R",
            OpCode::TcUitd => "OP_TC_UITD_R",
            OpCode::TcUiti => "OP_TC_UITI_R",
            OpCode::TcDtui => "OP_TC_DTUI_R",
            OpCode::TcItui => "OP_TC_ITUI_R",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_opcodes_count() {
        assert_eq!(ALL_OPCODES.len(), 60);
    }

    #[test]
    fn all_opcodes_sorted_and_unique() {
        for pair in ALL_OPCODES.windows(2) {
            assert!((pair[0] as u16) < (pair[1] as u16), "{pair:?}");
        }
    }

    #[test]
    fn roundtrip_all_valid_opcodes() {
        for &opcode in &ALL_OPCODES {
            let raw = opcode as u16;
            assert_eq!(OpCode::try_from(raw), Ok(opcode));
        }
    }

    #[test]
    fn gaps_are_rejected() {
        for raw in [17u16, 30, 42, 60, 80, 90, 97, 120, 128, 0xFFFF] {
            assert_eq!(OpCode::try_from(raw), Err(DecodeError::UnknownOpcode(raw)));
        }
    }

    #[test]
    fn categories_follow_ranges() {
        assert_eq!(OpCode::Nop.category(), Category::Nop);
        assert_eq!(OpCode::DNeg.category(), Category::Arithmetic);
        assert_eq!(OpCode::GetFlag.category(), Category::Logic);
        assert_eq!(OpCode::DestroyFrames.category(), Category::Memory);
        assert_eq!(OpCode::Halt.category(), Category::ControlFlow);
        assert_eq!(OpCode::SystemCall.category(), Category::SystemCall);
        assert_eq!(OpCode::TcItui.category(), Category::Conversion);
    }

    #[test]
    fn mnemonic_lookup() {
        for &opcode in &ALL_OPCODES {
            assert_eq!(OpCode::from_mnemonic(opcode.mnemonic()), Some(opcode));
        }
        assert_eq!(OpCode::from_mnemonic("OP_FROB"), None);
    }

    #[test]
    fn immediate_kinds() {
        assert_eq!(OpCode::MovRiInt.immediate_kind(), NumericKind::Int);
        assert_eq!(OpCode::MovRiDouble.immediate_kind(), NumericKind::Double);
        assert_eq!(OpCode::MovRiUint.immediate_kind(), NumericKind::Uint);
        assert_eq!(OpCode::Jmp.immediate_kind(), NumericKind::Uint);
    }
}
