//! Labels and jumps with deferred patching.

use malachite_common::{Instruction, OpCode};
use tracing::debug;

use super::ByteLowerer;
use crate::diagnostics::Diagnostic;
use crate::error::PendingJump;
use crate::state::LabelId;

impl<'s> ByteLowerer<'s> {
    /// Bind `label` to the next instruction and patch every jump waiting
    /// for it.
    pub(super) fn place_label(&mut self, label: LabelId) -> Result<(), Diagnostic> {
        if self.labels.contains_key(&label) {
            return Err(self.logic(format!("label {label} is defined twice")));
        }
        let target = self.output.len();
        self.labels.insert(label, target);
        if let Some(waiting) = self.pending.remove(&label) {
            debug!(label, target, patched = waiting.len(), "label resolved");
            for jump in waiting {
                self.output[jump.machine_ip].destination = target as u64;
            }
        }
        Ok(())
    }

    /// Emit a jump, patched later if the label is still ahead.
    pub(super) fn jump(&mut self, opcode: OpCode, label: LabelId, condition: u64) {
        let target = self.labels.get(&label).copied();
        let at = self.emit(Instruction::new(
            opcode,
            target.map_or(0, |t| t as u64),
            condition,
            0,
        ));
        if target.is_none() {
            self.pending.entry(label).or_default().push(PendingJump {
                label,
                pseudo_ip: self.ip,
                machine_ip: at,
            });
        }
    }

    /// `JMP_CV`/`JMP_CNV` on the top value, which is consumed.
    pub(super) fn conditional_jump(
        &mut self,
        opcode: OpCode,
        label: LabelId,
    ) -> Result<(), Diagnostic> {
        let condition = self.pop_value()?;
        self.jump(opcode, label, condition.register as u64);
        self.release(&condition);
        Ok(())
    }
}
