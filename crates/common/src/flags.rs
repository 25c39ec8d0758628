//! Bits of the VM flags word.

/// Last compare found the operands equal.
pub const EQUAL: u32 = 1 << 0;
/// Last compare found the operands different.
pub const NOT_EQUAL: u32 = 1 << 1;
/// Last compare found source0 greater.
pub const GREATER: u32 = 1 << 2;
/// Last compare found source0 less.
pub const LESS: u32 = 1 << 3;
/// The current instruction moved the instruction pointer itself.
pub const JUMPED: u32 = 1 << 4;
/// Execution halted and may be resumed.
pub const STOPPED: u32 = 1 << 5;

/// The bits a compare instruction rewrites.
pub const COMPARE_MASK: u32 = EQUAL | NOT_EQUAL | GREATER | LESS;

/// Compare flags by the names accepted in opcode blocks and assembly text.
pub const NAMED_FLAGS: [(&str, u32); 4] = [
    ("EQUAL", EQUAL),
    ("NOT_EQUAL", NOT_EQUAL),
    ("GREATER", GREATER),
    ("LESS", LESS),
];

/// Look up a compare flag by name.
pub fn by_name(name: &str) -> Option<u32> {
    NAMED_FLAGS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, bits)| *bits)
}
