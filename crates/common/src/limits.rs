//! Fixed sizes shared by the compiler and the VM.

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 255;

/// Width of a register and of the largest single memory transfer, in bytes.
pub const REGISTER_SIZE: u64 = 8;

/// Size of a heap pointer slot.
pub const POINTER_SIZE: u64 = 8;

/// Named registers available inside an opcode block (`RA`..`RH`).
pub const OPCODE_BLOCK_REGISTERS: usize = 8;

/// Packs a byte size and a frame depth into the single operand used by
/// the enclosing-frame load and store instructions.
pub const fn pack_size_depth(size: u64, depth: u64) -> u64 {
    (size << 32) | (depth & 0xFFFF_FFFF)
}

/// Inverse of [`pack_size_depth`]: returns `(size, depth)`.
pub const fn unpack_size_depth(packed: u64) -> (u64, u64) {
    (packed >> 32, packed & 0xFFFF_FFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack() {
        let packed = pack_size_depth(8, 2);
        assert_eq!(packed, (8 << 32) | 2);
        assert_eq!(unpack_size_depth(packed), (8, 2));
    }
}
