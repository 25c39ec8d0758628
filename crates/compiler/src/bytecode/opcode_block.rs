//! Opcode blocks: eight named registers held for the whole block.

use malachite_common::limits::OPCODE_BLOCK_REGISTERS;
use malachite_common::{Cell, Instruction, OpCode};

use super::memory::literal_move;
use super::{ByteLowerer, Origin, Value};
use crate::diagnostics::Diagnostic;
use crate::pseudo::{BlockOperand, BlockRegister, BlockSource};
use crate::state::VariableId;

impl<'s> ByteLowerer<'s> {
    pub(super) fn block_start(&mut self) -> Result<(), Diagnostic> {
        if self.block_registers.is_some() {
            return Err(self.logic("opcode blocks cannot nest"));
        }
        let mut held = [0usize; OPCODE_BLOCK_REGISTERS];
        for i in 0..OPCODE_BLOCK_REGISTERS {
            match self.registers.allocate() {
                Some(register) => held[i] = register,
                None => {
                    for register in &held[..i] {
                        self.registers.release(*register);
                    }
                    return Err(self.logic("not enough free registers for an opcode block"));
                }
            }
        }
        self.block_registers = Some(held);
        Ok(())
    }

    pub(super) fn block_end(&mut self) -> Result<(), Diagnostic> {
        let held = self
            .block_registers
            .take()
            .ok_or_else(|| self.logic("opcode block end without a start"))?;
        for register in held {
            self.registers.release(register);
        }
        Ok(())
    }

    fn block_register(&self, register: BlockRegister) -> Result<usize, Diagnostic> {
        self.block_registers
            .and_then(|held| held.get(register.index()).copied())
            .ok_or_else(|| self.logic(format!("{register} used outside an opcode block")))
    }

    fn block_operand(&self, operand: BlockOperand) -> Result<u64, Diagnostic> {
        match operand {
            BlockOperand::Register(register) => Ok(self.block_register(register)? as u64),
            BlockOperand::Value(value) => Ok(value),
        }
    }

    pub(super) fn block_command(
        &mut self,
        opcode: OpCode,
        destination: BlockOperand,
        source0: BlockOperand,
        source1: BlockOperand,
        immediate: Cell,
    ) -> Result<(), Diagnostic> {
        let instruction = Instruction {
            opcode,
            destination: self.block_operand(destination)?,
            source0: self.block_operand(source0)?,
            source1: self.block_operand(source1)?,
            immediate,
        };
        self.emit(instruction);
        Ok(())
    }

    /// `STORE_VR`: write a block register or a literal into a variable.
    pub(super) fn store_vr(
        &mut self,
        variable: VariableId,
        source: &BlockSource,
    ) -> Result<(), Diagnostic> {
        let slot = self.slot(variable)?;
        match source {
            BlockSource::Register(register) => {
                let register = self.block_register(*register)?;
                self.store_from(register, slot);
            }
            BlockSource::Literal(literal) => {
                let Some((opcode, cell, kind)) = literal_move(literal) else {
                    return Err(self.type_error(format!("{literal:?} cannot be stored")));
                };
                let register = self.allocate()?;
                self.emit(Instruction::with_immediate(opcode, register as u64, cell));
                let value = self.coerce(
                    Value {
                        register,
                        kind,
                        origin: Origin::Immediate,
                    },
                    slot.kind,
                )?;
                self.store_from(value.register, slot);
                self.release(&value);
            }
        }
        Ok(())
    }

    /// `LOAD_RV`: read a variable into a block register, bits unchanged.
    pub(super) fn load_rv(
        &mut self,
        register: BlockRegister,
        variable: VariableId,
    ) -> Result<(), Diagnostic> {
        let slot = self.slot(variable)?;
        let register = self.block_register(register)?;
        self.load_into(register, slot);
        Ok(())
    }
}
