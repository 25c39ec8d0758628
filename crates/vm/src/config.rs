//! VM sizing.

use crate::error::ConfigError;

/// Memory layout and stack capacities for one VM instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Total size of the flat memory buffer in bytes.
    pub memory_size: usize,
    /// Bytes at the bottom of memory reserved for the heap. The stack
    /// occupies `[heap_size, memory_size)` and grows down.
    pub heap_size: usize,
    /// Maximum number of pending return addresses.
    pub call_stack_capacity: usize,
    /// Maximum number of live data frames.
    pub data_stack_capacity: usize,
    /// Faults kept on the error stack before the oldest is dropped.
    pub error_stack_capacity: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            memory_size: 65536,
            heap_size: 32768,
            call_stack_capacity: 256,
            data_stack_capacity: 256,
            error_stack_capacity: 255,
        }
    }
}

impl VmConfig {
    /// Check that the layout leaves a stack region and every capacity is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heap_size >= self.memory_size {
            return Err(ConfigError::HeapTooLarge {
                heap: self.heap_size,
                memory: self.memory_size,
            });
        }
        if self.call_stack_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("call stack capacity"));
        }
        if self.data_stack_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("data stack capacity"));
        }
        if self.error_stack_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("error stack capacity"));
        }
        Ok(())
    }

    /// Size of the stack region.
    pub fn stack_size(&self) -> usize {
        self.memory_size - self.heap_size
    }
}
