//! The reinterpreted 64-bit cell used for registers and immediates.
//!
//! A cell is only raw bits. Reading it always names the kind explicitly
//! through one of the `as_*` accessors.

use std::fmt;

/// 64 raw bits, read as signed, unsigned or double on demand.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Cell(u64);

impl Cell {
    /// The all-zero cell.
    pub const ZERO: Cell = Cell(0);

    /// Wrap raw bits.
    pub const fn from_bits(bits: u64) -> Self {
        Cell(bits)
    }

    /// Store a signed integer.
    pub const fn from_int(value: i64) -> Self {
        Cell(value as u64)
    }

    /// Store an unsigned integer.
    pub const fn from_uint(value: u64) -> Self {
        Cell(value)
    }

    /// Store a double.
    pub fn from_float(value: f64) -> Self {
        Cell(value.to_bits())
    }

    /// The raw bits.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Read as a signed integer.
    pub const fn as_int(self) -> i64 {
        self.0 as i64
    }

    /// Read as an unsigned integer.
    pub const fn as_uint(self) -> u64 {
        self.0
    }

    /// Read as a double.
    pub fn as_float(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell({:#018x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_int_reads_back() {
        let cell = Cell::from_int(-5);
        assert_eq!(cell.as_int(), -5);
        assert_eq!(cell.as_uint(), u64::MAX - 4);
    }

    #[test]
    fn float_bits_are_preserved() {
        let cell = Cell::from_float(2.5);
        assert_eq!(cell.as_float(), 2.5);
        assert_eq!(cell.bits(), 2.5f64.to_bits());
    }
}
