//! Immediates, variable storage, frames and pseudonyms.

use malachite_common::limits::{pack_size_depth, POINTER_SIZE};
use malachite_common::{Cell, Instruction, NumericKind, OpCode};
use tracing::debug;

use super::registers::Pseudonym;
use super::{ByteLowerer, Origin, Slot, Value};
use crate::diagnostics::Diagnostic;
use crate::opcode_block::literal_cell;
use crate::state::{TypeCategory, VariableId};
use crate::syntax::Literal;

/// The move-immediate a literal lowers to, and the kind it produces.
pub(super) fn literal_move(literal: &Literal) -> Option<(OpCode, Cell, NumericKind)> {
    let cell = literal_cell(literal)?;
    let (opcode, kind) = match literal {
        Literal::Int(_) | Literal::Char(_) => (OpCode::MovRiInt, NumericKind::Int),
        Literal::Uint(_) | Literal::Bool(_) => (OpCode::MovRiUint, NumericKind::Uint),
        Literal::Float(_) => (OpCode::MovRiDouble, NumericKind::Double),
        Literal::Void | Literal::Str(_) => return None,
    };
    Some((opcode, cell, kind))
}

impl<'s> ByteLowerer<'s> {
    pub(super) fn immediate(&mut self, literal: &Literal) -> Result<(), Diagnostic> {
        let Some((opcode, cell, kind)) = literal_move(literal) else {
            return Err(self.type_error(format!("{literal:?} has no machine representation")));
        };
        let register = self.allocate()?;
        self.emit(Instruction::with_immediate(opcode, register as u64, cell));
        self.values.push(Value {
            register,
            kind,
            origin: Origin::Immediate,
        });
        Ok(())
    }

    pub(super) fn slot(&self, id: VariableId) -> Result<Slot, Diagnostic> {
        self.slots
            .get(&id)
            .copied()
            .ok_or_else(|| self.logic(format!("variable {id} has no storage")))
    }

    /// Load a slot into `register`, from the current frame or an ancestor.
    pub(super) fn load_into(&mut self, register: usize, slot: Slot) {
        let instruction = if self.current_depth() == Some(slot.depth) {
            Instruction::new(OpCode::LoadLocal, register as u64, slot.offset, slot.size)
        } else {
            Instruction::new(
                OpCode::LoadEnclosingA,
                register as u64,
                slot.offset,
                pack_size_depth(slot.size, slot.depth as u64),
            )
        };
        self.emit(instruction);
    }

    /// Store `register` into a slot, in the current frame or an ancestor.
    pub(super) fn store_from(&mut self, register: usize, slot: Slot) {
        let instruction = if self.current_depth() == Some(slot.depth) {
            Instruction::new(OpCode::StoreLocal, slot.offset, register as u64, slot.size)
        } else {
            Instruction::new(
                OpCode::StoreEnclosingA,
                slot.offset,
                register as u64,
                pack_size_depth(slot.size, slot.depth as u64),
            )
        };
        self.emit(instruction);
    }

    pub(super) fn load(&mut self, id: VariableId) -> Result<(), Diagnostic> {
        let slot = self.slot(id)?;
        let register = self.allocate()?;
        self.load_into(register, slot);
        self.values.push(Value {
            register,
            kind: slot.kind,
            origin: Origin::Variable(id),
        });
        Ok(())
    }

    pub(super) fn store(&mut self, id: VariableId) -> Result<(), Diagnostic> {
        let value = self.pop_value()?;
        let slot = match self.slot(id) {
            Ok(slot) => slot,
            Err(err) => {
                self.release(&value);
                return Err(err);
            }
        };
        let value = self.coerce(value, slot.kind)?;
        self.store_from(value.register, slot);
        self.release(&value);
        Ok(())
    }

    pub(super) fn declare(&mut self, id: VariableId) -> Result<(), Diagnostic> {
        let Some(depth) = self.current_depth() else {
            return Err(self.logic(format!("variable {id} declared outside any scope")));
        };
        let variable = self
            .state
            .variable(id)
            .ok_or_else(|| self.logic(format!("unknown variable {id}")))?;
        let ty = self
            .state
            .type_of(variable.type_id)
            .ok_or_else(|| self.logic(format!("\"{}\" has an unknown type", variable.name)))?;

        let (size, kind) = match (ty.category, ty.vm_kind) {
            (TypeCategory::Class, _) => (POINTER_SIZE, NumericKind::Uint),
            (_, Some(kind)) => (ty.size, kind),
            (_, None) => {
                return Err(self.type_error(format!(
                    "\"{}\" cannot have type {}",
                    variable.name, ty.name
                )))
            }
        };
        if size == 0 {
            return Err(self.logic(format!("type {} has zero size", ty.name)));
        }

        let offset = self.frames[depth];
        self.frames[depth] += size;
        self.slots.insert(
            id,
            Slot {
                depth,
                offset,
                size,
                kind,
            },
        );
        debug!(variable = id, depth, offset, size, "declare");
        self.emit(Instruction::new(OpCode::Push, size, 0, 0));
        Ok(())
    }

    // ---- Frames ----

    pub(super) fn scope_start(&mut self) {
        self.frames.push(0);
        debug!(depth = self.frames.len() - 1, "scope start");
        self.emit(Instruction::bare(OpCode::CreateFrame));
    }

    pub(super) fn scope_end(&mut self) -> Result<(), Diagnostic> {
        if self.frames.pop().is_none() {
            return Err(self.logic("scope end without a matching scope start"));
        }
        debug!(depth = self.frames.len(), "scope end");
        self.emit(Instruction::bare(OpCode::DestroyFrame));
        self.registers.clear_scope();
        self.values.clear();
        Ok(())
    }

    /// Unwind frames at run time for a jump out of nested scopes. The
    /// static layout is unchanged.
    pub(super) fn close_scopes(&mut self, count: u64) -> Result<(), Diagnostic> {
        if count as usize > self.frames.len() {
            return Err(self.logic(format!(
                "cannot close {count} scopes, only {} are open",
                self.frames.len()
            )));
        }
        self.emit(Instruction::new(OpCode::DestroyFrames, count, 0, 0));
        Ok(())
    }

    // ---- Value stack ----

    pub(super) fn push_argument(&mut self) -> Result<(), Diagnostic> {
        let value = self.pop_value()?;
        self.release(&value);
        Ok(())
    }

    pub(super) fn discard(&mut self) {
        if let Some(value) = self.values.pop() {
            self.release(&value);
        }
    }

    // ---- Pseudonyms ----

    pub(super) fn save_pseudonym(&mut self, name: &str) -> Result<(), Diagnostic> {
        let value = self.pop_value()?;
        if self.registers.pseudonym(name).is_some() {
            self.release(&value);
            return Err(self.logic(format!("pseudonym \"{name}\" is already bound")));
        }
        let register = self.allocate()?;
        self.emit(Instruction::new(
            OpCode::MovRr,
            register as u64,
            value.register as u64,
            0,
        ));
        self.release(&value);
        self.registers.bind(
            name,
            Pseudonym {
                register,
                kind: value.kind,
            },
        );
        Ok(())
    }

    pub(super) fn load_pseudonym(&mut self, name: &str) -> Result<(), Diagnostic> {
        let pseudonym = self
            .registers
            .pseudonym(name)
            .ok_or_else(|| self.logic(format!("unknown pseudonym \"{name}\"")))?;
        self.values.push(Value {
            register: pseudonym.register,
            kind: pseudonym.kind,
            origin: Origin::Pseudonym(name.to_string()),
        });
        Ok(())
    }

    pub(super) fn release_pseudonym(&mut self, name: &str) -> Result<(), Diagnostic> {
        match self.registers.unbind(name) {
            Some(_) => Ok(()),
            None => Err(self.logic(format!("unknown pseudonym \"{name}\""))),
        }
    }
}
