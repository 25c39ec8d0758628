//! Main execution loop and opcode dispatch for the Malachite VM.

use std::io::Write;

use malachite_common::flags::{COMPARE_MASK, EQUAL, GREATER, JUMPED, LESS, NOT_EQUAL, STOPPED};
use malachite_common::limits::unpack_size_depth;
use malachite_common::{Category, Cell, Instruction, OpCode, SysCall};
use tracing::trace;

use crate::error::{ErrorKind, Fault};
use crate::machine::{DataFrame, Termination, VM};

impl<'a> VM<'a> {
    /// Run until `OP_HALT`, the end of the program, or a fault.
    ///
    /// A VM that stopped on `OP_HALT` resumes at the instruction after the
    /// halt, keeping registers, memory and stacks. Otherwise execution
    /// starts at instruction 0.
    pub fn execute(&mut self) -> Result<Termination, Fault> {
        if self.program.is_empty() {
            return Err(self.fault(ErrorKind::InvalidProgram));
        }
        if self.flags & STOPPED != 0 {
            self.flags &= !STOPPED;
        } else {
            self.ip = 0;
        }

        while let Some(&instr) = self.program.get(self.ip) {
            self.flags &= !JUMPED;

            let result = match instr.opcode.category() {
                Category::Nop => Ok(()),
                Category::Arithmetic => self.exec_arithmetic(&instr),
                Category::Logic => self.exec_logic(&instr),
                Category::Memory => self.exec_memory(&instr),
                Category::ControlFlow if instr.opcode == OpCode::Halt => {
                    return Ok(self.exec_halt());
                }
                Category::ControlFlow => self.exec_control_flow(&instr),
                Category::SystemCall => self.exec_syscall(&instr),
                Category::Conversion => self.exec_conversion(&instr),
            };

            if let Err(kind) = result {
                return Err(self.fault(kind));
            }
            if self.flags & JUMPED == 0 {
                self.ip += 1;
            }
        }

        Ok(Termination::Finished)
    }

    /// Stop with STOPPED set and `ip` moved past the halt, so the next
    /// `execute()` continues after it instead of halting again on the same
    /// instruction.
    fn exec_halt(&mut self) -> Termination {
        let at = self.ip;
        trace!(ip = at, "halt");
        self.flags |= STOPPED;
        self.ip += 1;
        Termination::Halted { at }
    }

    // ---- Arithmetic ----

    fn exec_arithmetic(&mut self, instr: &Instruction) -> Result<(), ErrorKind> {
        match instr.opcode {
            OpCode::IAdd => self.binary(instr, |a, b| Ok(int(a.as_int().wrapping_add(b.as_int())))),
            OpCode::ISub => self.binary(instr, |a, b| Ok(int(a.as_int().wrapping_sub(b.as_int())))),
            OpCode::IMul => self.binary(instr, |a, b| Ok(int(a.as_int().wrapping_mul(b.as_int())))),
            OpCode::IDiv => self.binary(instr, |a, b| match b.as_int() {
                0 => Err(ErrorKind::ZeroDivision),
                d => Ok(int(a.as_int().wrapping_div(d))),
            }),
            OpCode::IMod => self.binary(instr, |a, b| match b.as_int() {
                0 => Err(ErrorKind::ZeroDivision),
                d => Ok(int(a.as_int().wrapping_rem(d))),
            }),
            OpCode::INeg => self.unary(instr, |a| int(a.as_int().wrapping_neg())),

            OpCode::UAdd => {
                self.binary(instr, |a, b| Ok(uint(a.as_uint().wrapping_add(b.as_uint()))))
            }
            OpCode::USub => {
                self.binary(instr, |a, b| Ok(uint(a.as_uint().wrapping_sub(b.as_uint()))))
            }
            OpCode::UMul => {
                self.binary(instr, |a, b| Ok(uint(a.as_uint().wrapping_mul(b.as_uint()))))
            }
            OpCode::UDiv => self.binary(instr, |a, b| match b.as_uint() {
                0 => Err(ErrorKind::ZeroDivision),
                d => Ok(uint(a.as_uint() / d)),
            }),
            OpCode::UMod => self.binary(instr, |a, b| match b.as_uint() {
                0 => Err(ErrorKind::ZeroDivision),
                d => Ok(uint(a.as_uint() % d)),
            }),

            OpCode::DAdd => {
                self.binary(instr, |a, b| Ok(Cell::from_float(a.as_float() + b.as_float())))
            }
            OpCode::DSub => {
                self.binary(instr, |a, b| Ok(Cell::from_float(a.as_float() - b.as_float())))
            }
            OpCode::DMul => {
                self.binary(instr, |a, b| Ok(Cell::from_float(a.as_float() * b.as_float())))
            }
            OpCode::DDiv => self.binary(instr, |a, b| {
                if b.as_float() == 0.0 {
                    Err(ErrorKind::ZeroDivision)
                } else {
                    Ok(Cell::from_float(a.as_float() / b.as_float()))
                }
            }),
            OpCode::DNeg => self.unary(instr, |a| Cell::from_float(-a.as_float())),
            _ => Ok(()),
        }
    }

    /// `destination = op(source0, source1)`.
    fn binary(
        &mut self,
        instr: &Instruction,
        op: impl FnOnce(Cell, Cell) -> Result<Cell, ErrorKind>,
    ) -> Result<(), ErrorKind> {
        let a = self.reg(instr.source0)?;
        let b = self.reg(instr.source1)?;
        let result = op(a, b)?;
        self.set_reg(instr.destination, result)
    }

    /// `destination = op(source0)`.
    fn unary(
        &mut self,
        instr: &Instruction,
        op: impl FnOnce(Cell) -> Cell,
    ) -> Result<(), ErrorKind> {
        let a = self.reg(instr.source0)?;
        self.set_reg(instr.destination, op(a))
    }

    // ---- Logic ----

    fn exec_logic(&mut self, instr: &Instruction) -> Result<(), ErrorKind> {
        match instr.opcode {
            OpCode::And => self.binary(instr, |a, b| Ok(truth(a.bits() != 0 && b.bits() != 0))),
            OpCode::Or => self.binary(instr, |a, b| Ok(truth(a.bits() != 0 || b.bits() != 0))),
            OpCode::Not => self.unary(instr, |a| truth(a.bits() == 0)),
            OpCode::BitOr => self.binary(instr, |a, b| Ok(uint(a.bits() | b.bits()))),
            OpCode::BitNot => self.unary(instr, |a| uint(!a.bits())),
            OpCode::BitAnd => self.binary(instr, |a, b| Ok(uint(a.bits() & b.bits()))),
            OpCode::BitShiftLeft => {
                self.binary(instr, |a, b| Ok(int(a.as_int().wrapping_shl(b.as_uint() as u32))))
            }
            OpCode::BitShiftRight => {
                self.binary(instr, |a, b| Ok(int(a.as_int().wrapping_shr(b.as_uint() as u32))))
            }
            OpCode::Cmp => {
                let a = self.reg(instr.source0)?.as_int();
                let b = self.reg(instr.source1)?.as_int();
                self.set_compare_flags(a.cmp(&b));
                Ok(())
            }
            OpCode::DCmp => {
                let a = self.reg(instr.source0)?.as_float();
                let b = self.reg(instr.source1)?.as_float();
                match a.partial_cmp(&b) {
                    Some(ordering) => {
                        self.set_compare_flags(ordering);
                        Ok(())
                    }
                    None => {
                        self.flags &= !COMPARE_MASK;
                        Err(ErrorKind::NanFloatValue)
                    }
                }
            }
            OpCode::GetFlag => {
                let set = self.flags & (instr.source0 as u32) != 0;
                self.set_reg(instr.destination, truth(set))
            }
            _ => Ok(()),
        }
    }

    fn set_compare_flags(&mut self, ordering: std::cmp::Ordering) {
        self.flags &= !COMPARE_MASK;
        self.flags |= match ordering {
            std::cmp::Ordering::Equal => EQUAL,
            std::cmp::Ordering::Greater => NOT_EQUAL | GREATER,
            std::cmp::Ordering::Less => NOT_EQUAL | LESS,
        };
    }

    // ---- Memory ----

    fn exec_memory(&mut self, instr: &Instruction) -> Result<(), ErrorKind> {
        match instr.opcode {
            OpCode::LoadRm => {
                let address = self.absolute_address(instr.source0, instr.source1)?;
                let value = self.read_le(address, instr.source1);
                self.set_reg(instr.destination, uint(value))
            }
            OpCode::StoreMr => {
                let address = self.absolute_address(instr.destination, instr.source1)?;
                let value = self.reg(instr.source0)?.bits();
                self.write_le(address, instr.source1, value);
                Ok(())
            }
            OpCode::MovRr => {
                let value = self.reg(instr.source0)?;
                self.set_reg(instr.destination, value)
            }
            OpCode::MovRiInt | OpCode::MovRiUint | OpCode::MovRiDouble => {
                self.set_reg(instr.destination, instr.immediate)
            }
            OpCode::CreateFrame => {
                if self.data_stack.len() >= self.config.data_stack_capacity {
                    return Err(ErrorKind::StackOverflow);
                }
                self.data_stack.push(DataFrame {
                    fp: self.fp,
                    sp: self.sp,
                });
                self.fp = self.sp;
                Ok(())
            }
            OpCode::DestroyFrame => self.destroy_frames(1),
            OpCode::DestroyFrames => self.destroy_frames(instr.destination),
            OpCode::Push => {
                let size =
                    usize::try_from(instr.destination).map_err(|_| ErrorKind::StackOverflow)?;
                let new_sp = self
                    .sp
                    .checked_sub(size)
                    .filter(|sp| *sp >= self.config.heap_size)
                    .ok_or(ErrorKind::StackOverflow)?;
                self.memory[new_sp..self.sp].fill(0);
                self.sp = new_sp;
                Ok(())
            }
            OpCode::Pop => {
                let new_sp = usize::try_from(instr.destination)
                    .ok()
                    .and_then(|size| self.sp.checked_add(size))
                    .filter(|sp| *sp <= self.fp)
                    .ok_or(ErrorKind::StackUnderflow)?;
                self.sp = new_sp;
                Ok(())
            }
            OpCode::LoadLocal => {
                let address = self.frame_address(self.fp, instr.source0, instr.source1)?;
                let value = self.read_le(address, instr.source1);
                self.set_reg(instr.destination, uint(value))
            }
            OpCode::StoreLocal => {
                let address = self.frame_address(self.fp, instr.destination, instr.source1)?;
                let value = self.reg(instr.source0)?.bits();
                self.write_le(address, instr.source1, value);
                Ok(())
            }
            OpCode::LoadEnclosingA | OpCode::LoadEnclosingR => {
                let (size, depth) = unpack_size_depth(instr.source1);
                let fp = self.enclosing_frame(instr.opcode, depth)?;
                let address = self.frame_address(fp, instr.source0, size)?;
                let value = self.read_le(address, size);
                self.set_reg(instr.destination, uint(value))
            }
            OpCode::StoreEnclosingA | OpCode::StoreEnclosingR => {
                let (size, depth) = unpack_size_depth(instr.source1);
                let fp = self.enclosing_frame(instr.opcode, depth)?;
                let address = self.frame_address(fp, instr.destination, size)?;
                let value = self.reg(instr.source0)?.bits();
                self.write_le(address, size, value);
                Ok(())
            }
            OpCode::AllocateMemory => {
                let size = self.reg(instr.source0)?.as_uint();
                let start = self.hp;
                let end = usize::try_from(size)
                    .ok()
                    .and_then(|size| start.checked_add(size))
                    .filter(|end| *end <= self.config.heap_size)
                    .ok_or(ErrorKind::MemoryAccessViolation)?;
                self.hp = end;
                self.set_reg(instr.destination, uint(start as u64))
            }
            OpCode::FreeMemory => {
                let pointer = self.reg(instr.source0)?.as_uint();
                let size = self.reg(instr.source1)?.as_uint();
                if pointer.checked_add(size) == Some(self.hp as u64) {
                    self.hp = pointer as usize;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn destroy_frames(&mut self, count: u64) -> Result<(), ErrorKind> {
        let count = usize::try_from(count).map_err(|_| ErrorKind::StackUnderflow)?;
        if count == 0 {
            return Ok(());
        }
        let keep = self
            .data_stack
            .len()
            .checked_sub(count)
            .ok_or(ErrorKind::StackUnderflow)?;
        let restored = self.data_stack[keep];
        self.data_stack.truncate(keep);
        self.fp = restored.fp;
        self.sp = restored.sp;
        Ok(())
    }

    fn enclosing_frame(&self, opcode: OpCode, depth: u64) -> Result<usize, ErrorKind> {
        let depth = usize::try_from(depth).map_err(|_| ErrorKind::StackUnderflow)?;
        match opcode {
            OpCode::LoadEnclosingA | OpCode::StoreEnclosingA => self.frame_pointer(depth),
            _ => self.relative_frame_pointer(depth),
        }
    }

    // ---- Control flow ----

    fn exec_control_flow(&mut self, instr: &Instruction) -> Result<(), ErrorKind> {
        match instr.opcode {
            OpCode::Jmp => self.jump(instr.destination),
            OpCode::JmpCv => {
                if self.reg(instr.source0)?.bits() != 0 {
                    self.jump(instr.destination);
                }
            }
            OpCode::JmpCnv => {
                if self.reg(instr.source0)?.bits() == 0 {
                    self.jump(instr.destination);
                }
            }
            OpCode::Call => {
                if self.call_stack.len() >= self.config.call_stack_capacity {
                    return Err(ErrorKind::StackOverflow);
                }
                self.call_stack.push(self.ip + 1);
                self.jump(instr.destination);
            }
            OpCode::Ret => {
                let target = self.call_stack.pop().ok_or(ErrorKind::StackUnderflow)?;
                self.jump(target as u64);
            }
            _ => {}
        }
        Ok(())
    }

    fn jump(&mut self, target: u64) {
        self.ip = usize::try_from(target).unwrap_or(usize::MAX);
        self.flags |= JUMPED;
    }

    // ---- System calls ----

    fn exec_syscall(&mut self, instr: &Instruction) -> Result<(), ErrorKind> {
        let call = SysCall::try_from(instr.destination).map_err(|_| ErrorKind::InvalidSyscall)?;
        let arg = self.reg(instr.source0)?;
        let written = match call {
            SysCall::PrintInt => write!(self.output, "{}", arg.as_int()),
            SysCall::PrintUint => write!(self.output, "{}", arg.as_uint()),
            SysCall::PrintDouble => write!(self.output, "{}", arg.as_float()),
            SysCall::PrintChar => write!(self.output, "{}", arg.as_uint() as u8 as char),
            SysCall::PrintCharArray => {
                let len = self.reg(instr.source1)?.as_uint();
                let start = usize::try_from(arg.as_uint())
                    .map_err(|_| ErrorKind::MemoryAccessViolation)?;
                let end = usize::try_from(len)
                    .ok()
                    .and_then(|len| start.checked_add(len))
                    .filter(|end| *end <= self.config.memory_size)
                    .ok_or(ErrorKind::MemoryAccessViolation)?;
                let VM { output, memory, .. } = self;
                output
                    .write_all(&memory[start..end])
                    .and_then(|()| output.write_all(b"\n"))
            }
        };
        written.map_err(|_| ErrorKind::OutputFailed)
    }

    // ---- Type conversion ----

    fn exec_conversion(&mut self, instr: &Instruction) -> Result<(), ErrorKind> {
        let value = self.reg(instr.destination)?;
        let converted = match instr.opcode {
            OpCode::TcItd => Cell::from_float(value.as_int() as f64),
            OpCode::TcDti => int(value.as_float() as i64),
            OpCode::TcUitd => Cell::from_float(value.as_uint() as f64),
            OpCode::TcUiti => int(value.as_uint() as i64),
            OpCode::TcDtui => uint(value.as_float() as u64),
            OpCode::TcItui => uint(value.as_int() as u64),
            _ => value,
        };
        self.set_reg(instr.destination, converted)
    }
}

fn int(value: i64) -> Cell {
    Cell::from_int(value)
}

fn uint(value: u64) -> Cell {
    Cell::from_uint(value)
}

fn truth(value: bool) -> Cell {
    Cell::from_uint(u64::from(value))
}
