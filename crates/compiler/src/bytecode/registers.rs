//! Register allocation: a busy bitset plus named long-lived registers.

use std::collections::HashMap;

use malachite_common::limits::REGISTER_COUNT;
use malachite_common::NumericKind;

const WORDS: usize = (REGISTER_COUNT + 63) / 64;

/// A register held under a name across statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pseudonym {
    pub register: usize,
    pub kind: NumericKind,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterTable {
    busy: [u64; WORDS],
    pseudonyms: HashMap<String, Pseudonym>,
}

impl RegisterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lowest free register.
    pub fn allocate(&mut self) -> Option<usize> {
        let register = (0..REGISTER_COUNT).find(|r| !self.is_busy(*r))?;
        self.busy[register / 64] |= 1 << (register % 64);
        Some(register)
    }

    pub fn release(&mut self, register: usize) {
        if register < REGISTER_COUNT {
            self.busy[register / 64] &= !(1 << (register % 64));
        }
    }

    pub fn is_busy(&self, register: usize) -> bool {
        register < REGISTER_COUNT && self.busy[register / 64] & (1 << (register % 64)) != 0
    }

    pub fn busy_count(&self) -> usize {
        self.busy.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Free every register except the ones held by pseudonyms.
    pub fn clear_scope(&mut self) {
        self.busy = [0; WORDS];
        let held: Vec<usize> = self.pseudonyms.values().map(|p| p.register).collect();
        for register in held {
            self.busy[register / 64] |= 1 << (register % 64);
        }
    }

    pub fn bind(&mut self, name: &str, pseudonym: Pseudonym) {
        self.pseudonyms.insert(name.to_string(), pseudonym);
    }

    pub fn pseudonym(&self, name: &str) -> Option<Pseudonym> {
        self.pseudonyms.get(name).copied()
    }

    /// Drop a pseudonym and free its register.
    pub fn unbind(&mut self, name: &str) -> Option<Pseudonym> {
        let pseudonym = self.pseudonyms.remove(name)?;
        self.release(pseudonym.register);
        Some(pseudonym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_lowest_free() {
        let mut table = RegisterTable::new();
        assert_eq!(table.allocate(), Some(0));
        assert_eq!(table.allocate(), Some(1));
        table.release(0);
        assert_eq!(table.allocate(), Some(0));
        assert_eq!(table.busy_count(), 2);
    }

    #[test]
    fn exhaustion() {
        let mut table = RegisterTable::new();
        for expected in 0..REGISTER_COUNT {
            assert_eq!(table.allocate(), Some(expected));
        }
        assert_eq!(table.allocate(), None);
        table.release(200);
        assert_eq!(table.allocate(), Some(200));
    }

    #[test]
    fn clear_scope_keeps_pseudonyms() {
        let mut table = RegisterTable::new();
        let held = table.allocate().unwrap();
        table.bind(
            "for0.end",
            Pseudonym {
                register: held,
                kind: NumericKind::Int,
            },
        );
        table.allocate().unwrap();
        table.allocate().unwrap();
        table.clear_scope();
        assert_eq!(table.busy_count(), 1);
        assert!(table.is_busy(held));
        assert!(table.unbind("for0.end").is_some());
        assert_eq!(table.busy_count(), 0);
    }
}
