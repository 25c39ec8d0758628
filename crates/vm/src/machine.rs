//! VM state: register file, pointers, flags, memory and the three stacks.

use std::collections::VecDeque;
use std::io::{self, Write};

use malachite_common::limits::{REGISTER_COUNT, REGISTER_SIZE};
use malachite_common::{Cell, Program};
use tracing::debug;

use crate::config::VmConfig;
use crate::error::{ConfigError, ErrorKind, Fault};

/// A saved (frame pointer, stack pointer) pair.
///
/// `CREATE_FRAME` pushes the pair that was current *before* the new frame,
/// so entry `i` holds the pointers of the frame at depth `i - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFrame {
    pub fp: usize,
    pub sp: usize,
}

/// How a call to [`VM::execute`] ended without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `OP_HALT` at the given index. The next `execute` resumes after it.
    Halted { at: usize },
    /// The instruction pointer ran past the last instruction.
    Finished,
}

/// The Malachite virtual machine.
pub struct VM<'a> {
    /// The program being executed.
    pub(crate) program: &'a Program,
    pub(crate) config: VmConfig,
    pub(crate) registers: [Cell; REGISTER_COUNT],
    /// Instruction pointer.
    pub(crate) ip: usize,
    /// Stack pointer; the stack grows down from `memory_size`.
    pub(crate) sp: usize,
    /// Heap pointer; the next free heap byte.
    pub(crate) hp: usize,
    /// Frame pointer of the innermost frame.
    pub(crate) fp: usize,
    pub(crate) flags: u32,
    pub(crate) memory: Vec<u8>,
    /// Return addresses.
    pub(crate) call_stack: Vec<usize>,
    pub(crate) data_stack: Vec<DataFrame>,
    pub(crate) error_stack: VecDeque<Fault>,
    /// Destination of the print system calls.
    pub(crate) output: Box<dyn Write + 'a>,
}

impl<'a> VM<'a> {
    /// Create a VM with the default configuration, printing to stdout.
    pub fn new(program: &'a Program) -> Self {
        Self::build(program, VmConfig::default())
    }

    /// Create a VM with a custom configuration.
    pub fn with_config(program: &'a Program, config: VmConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(program, config))
    }

    fn build(program: &'a Program, config: VmConfig) -> Self {
        Self {
            program,
            config,
            registers: [Cell::ZERO; REGISTER_COUNT],
            ip: 0,
            sp: config.memory_size,
            hp: 0,
            fp: config.memory_size,
            flags: 0,
            memory: vec![0; config.memory_size],
            call_stack: Vec::new(),
            data_stack: Vec::new(),
            error_stack: VecDeque::new(),
            output: Box::new(io::stdout()),
        }
    }

    /// Route system-call output to `output` instead of stdout.
    pub fn with_output(mut self, output: impl Write + 'a) -> Self {
        self.output = Box::new(output);
        self
    }

    // ---- Observers ----

    /// Contents of register `index`, if it exists.
    pub fn register(&self, index: usize) -> Option<Cell> {
        self.registers.get(index).copied()
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn fp(&self) -> usize {
        self.fp
    }

    pub fn hp(&self) -> usize {
        self.hp
    }

    /// The whole memory buffer.
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Recorded faults, oldest first.
    pub fn error_stack(&self) -> impl Iterator<Item = &Fault> {
        self.error_stack.iter()
    }

    /// Number of live data frames.
    pub fn frame_depth(&self) -> usize {
        self.data_stack.len()
    }

    /// Read a variable slot of the frame at absolute `depth`, the way
    /// `OP_LOAD_ENCLOSING_A` would.
    pub fn read_local(&self, depth: usize, offset: u64, size: u64) -> Result<u64, ErrorKind> {
        let fp = self.frame_pointer(depth)?;
        let address = self.frame_address(fp, offset, size)?;
        Ok(self.read_le(address, size))
    }

    // ---- Register access ----

    pub(crate) fn reg(&self, index: u64) -> Result<Cell, ErrorKind> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.registers.get(i))
            .copied()
            .ok_or(ErrorKind::InvalidRegister)
    }

    pub(crate) fn set_reg(&mut self, index: u64, value: Cell) -> Result<(), ErrorKind> {
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| self.registers.get_mut(i))
            .ok_or(ErrorKind::InvalidRegister)?;
        *slot = value;
        Ok(())
    }

    // ---- Memory access ----

    /// Validate an absolute transfer of `size` bytes at `address`.
    pub(crate) fn absolute_address(&self, address: u64, size: u64) -> Result<usize, ErrorKind> {
        check_size(size)?;
        let start = usize::try_from(address).map_err(|_| ErrorKind::MemoryAccessViolation)?;
        let end = start
            .checked_add(size as usize)
            .ok_or(ErrorKind::MemoryAccessViolation)?;
        if end > self.config.memory_size {
            return Err(ErrorKind::MemoryAccessViolation);
        }
        Ok(start)
    }

    /// Address of the slot at `offset` (size `size`) below frame pointer `fp`.
    ///
    /// The slot occupies `[fp - offset - size, fp - offset)` and must lie
    /// inside the stack region.
    pub(crate) fn frame_address(
        &self,
        fp: usize,
        offset: u64,
        size: u64,
    ) -> Result<usize, ErrorKind> {
        check_size(size)?;
        let span = offset
            .checked_add(size)
            .and_then(|s| usize::try_from(s).ok())
            .ok_or(ErrorKind::MemoryAccessViolation)?;
        let address = fp.checked_sub(span).ok_or(ErrorKind::MemoryAccessViolation)?;
        if address < self.config.heap_size || fp > self.config.memory_size {
            return Err(ErrorKind::MemoryAccessViolation);
        }
        Ok(address)
    }

    /// Frame pointer of the frame at absolute `depth` (0 = outermost).
    pub(crate) fn frame_pointer(&self, depth: usize) -> Result<usize, ErrorKind> {
        let live = self.data_stack.len();
        if depth >= live {
            return Err(ErrorKind::StackUnderflow);
        }
        if depth + 1 == live {
            Ok(self.fp)
        } else {
            Ok(self.data_stack[depth + 1].fp)
        }
    }

    /// Frame pointer of the frame `up` levels above the current one.
    pub(crate) fn relative_frame_pointer(&self, up: usize) -> Result<usize, ErrorKind> {
        let live = self.data_stack.len();
        if up >= live {
            return Err(ErrorKind::StackUnderflow);
        }
        self.frame_pointer(live - 1 - up)
    }

    /// Little-endian read, zero-extended. Caller has bounds-checked.
    pub(crate) fn read_le(&self, address: usize, size: u64) -> u64 {
        self.memory[address..address + size as usize]
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, byte)| acc | (u64::from(*byte) << (i * 8)))
    }

    /// Little-endian write of the low `size` bytes. Caller has bounds-checked.
    pub(crate) fn write_le(&mut self, address: usize, size: u64, value: u64) {
        let bytes = value.to_le_bytes();
        self.memory[address..address + size as usize].copy_from_slice(&bytes[..size as usize]);
    }

    /// Record a fault at the current instruction pointer.
    pub(crate) fn fault(&mut self, kind: ErrorKind) -> Fault {
        let fault = Fault { kind, ip: self.ip };
        if self.error_stack.len() >= self.config.error_stack_capacity {
            self.error_stack.pop_front();
        }
        self.error_stack.push_back(fault);
        debug!(ip = fault.ip, code = kind.code(), "vm fault: {kind}");
        fault
    }
}

fn check_size(size: u64) -> Result<(), ErrorKind> {
    if size == 0 || size > REGISTER_SIZE {
        Err(ErrorKind::MemoryAccessViolation)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use malachite_common::{Instruction, OpCode};

    fn halt_only() -> Program {
        Program::new(vec![Instruction::bare(OpCode::Halt)])
    }

    #[test]
    fn fresh_state() {
        let program = halt_only();
        let vm = VM::new(&program);
        assert_eq!(vm.sp(), 65536);
        assert_eq!(vm.fp(), 65536);
        assert_eq!(vm.hp(), 0);
        assert_eq!(vm.frame_depth(), 0);
        assert_eq!(vm.register(0), Some(Cell::ZERO));
        assert_eq!(vm.register(255), None);
    }

    #[test]
    fn invalid_config_rejected() {
        let program = halt_only();
        let config = VmConfig {
            heap_size: 100,
            memory_size: 50,
            ..VmConfig::default()
        };
        assert!(VM::with_config(&program, config).is_err());
    }

    #[test]
    fn frame_address_layout() {
        let program = halt_only();
        let vm = VM::new(&program);
        assert_eq!(vm.frame_address(65536, 0, 8), Ok(65528));
        assert_eq!(vm.frame_address(65536, 8, 1), Ok(65527));
        assert_eq!(
            vm.frame_address(65536, 0, 9),
            Err(ErrorKind::MemoryAccessViolation)
        );
        assert_eq!(
            vm.frame_address(32770, 0, 8),
            Err(ErrorKind::MemoryAccessViolation)
        );
    }

    #[test]
    fn little_endian_roundtrip() {
        let program = halt_only();
        let mut vm = VM::new(&program);
        vm.write_le(100, 4, 0x1122_3344_5566_7788);
        assert_eq!(&vm.memory()[100..104], &[0x88, 0x77, 0x66, 0x55]);
        assert_eq!(vm.read_le(100, 4), 0x5566_7788);
    }

    #[test]
    fn error_stack_drops_oldest() {
        let program = halt_only();
        let config = VmConfig {
            error_stack_capacity: 2,
            ..VmConfig::default()
        };
        let mut vm = VM::with_config(&program, config).unwrap();
        vm.ip = 1;
        vm.fault(ErrorKind::ZeroDivision);
        vm.ip = 2;
        vm.fault(ErrorKind::StackOverflow);
        vm.ip = 3;
        vm.fault(ErrorKind::StackUnderflow);
        let ips: Vec<usize> = vm.error_stack().map(|f| f.ip).collect();
        assert_eq!(ips, vec![2, 3]);
    }
}
