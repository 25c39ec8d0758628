//! Byte lowering: pseudo stream to machine instructions.
//!
//! One linear pass. The lowerer tracks which register holds each live
//! value, the byte layout of every open frame, and jumps waiting for their
//! label. Handlers report problems as [`Diagnostic`]s and lowering moves
//! on; only an unrewritten loop signal or a jump to a label that never
//! appears stops the pass.

mod arithmetic;
mod control;
mod memory;
mod opcode_block;
pub mod registers;

use std::collections::{BTreeMap, HashMap};

use malachite_common::limits::OPCODE_BLOCK_REGISTERS;
use malachite_common::{Instruction, NumericKind, OpCode, Program};
use tracing::{debug, trace};

use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::error::{LowerError, PendingJump};
use crate::pseudo::PseudoOp;
use crate::state::{CompilationState, LabelId, VariableId};

use self::registers::RegisterTable;

/// Where a live value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Immediate,
    Variable(VariableId),
    Result,
    /// Borrowed from a pseudonym; never released or overwritten.
    Pseudonym(String),
}

/// A value held in a register during lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub register: usize,
    pub kind: NumericKind,
    pub origin: Origin,
}

impl Value {
    fn owns_register(&self) -> bool {
        !matches!(self.origin, Origin::Pseudonym(_))
    }
}

/// Where a declared variable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Frame index, 0 for the outermost frame.
    pub depth: usize,
    /// Bytes between the frame pointer and the top of the slot.
    pub offset: u64,
    pub size: u64,
    pub kind: NumericKind,
}

/// Lower a pseudo stream to a program ending in `OP_HALT`.
pub fn lower(
    state: &CompilationState,
    ops: &[PseudoOp],
    diagnostics: &mut Diagnostics,
) -> Result<Program, LowerError> {
    let mut lowerer = ByteLowerer::new(state);
    for (ip, op) in ops.iter().enumerate() {
        lowerer.ip = ip;
        if let PseudoOp::Signal { kind, .. } = op {
            return Err(LowerError::UnrewrittenSignal { ip, kind: *kind });
        }
        if let Err(diagnostic) = lowerer.lower_op(op) {
            diagnostics.push(diagnostic);
        }
    }
    lowerer.finish()
}

pub(crate) struct ByteLowerer<'s> {
    state: &'s CompilationState,
    /// Index of the pseudo op being lowered.
    ip: usize,
    output: Vec<Instruction>,
    registers: RegisterTable,
    /// Running byte size of each open frame, outermost first.
    frames: Vec<u64>,
    slots: HashMap<VariableId, Slot>,
    values: Vec<Value>,
    labels: HashMap<LabelId, usize>,
    pending: BTreeMap<LabelId, Vec<PendingJump>>,
    block_registers: Option<[usize; OPCODE_BLOCK_REGISTERS]>,
}

impl<'s> ByteLowerer<'s> {
    pub(crate) fn new(state: &'s CompilationState) -> Self {
        Self {
            state,
            ip: 0,
            output: Vec::new(),
            registers: RegisterTable::new(),
            frames: Vec::new(),
            slots: HashMap::new(),
            values: Vec::new(),
            labels: HashMap::new(),
            pending: BTreeMap::new(),
            block_registers: None,
        }
    }

    fn lower_op(&mut self, op: &PseudoOp) -> Result<(), Diagnostic> {
        match op {
            PseudoOp::Nop => Ok(()),
            PseudoOp::Immediate(literal) => self.immediate(literal),
            PseudoOp::Push => self.push_argument(),
            PseudoOp::Pop => {
                self.discard();
                Ok(())
            }
            PseudoOp::Load(id) => self.load(*id),
            PseudoOp::Store(id) => self.store(*id),
            PseudoOp::ScopeStart => {
                self.scope_start();
                Ok(())
            }
            PseudoOp::ScopeEnd => self.scope_end(),
            PseudoOp::CloseScopes(count) => self.close_scopes(*count),
            PseudoOp::Label { id, .. } => self.place_label(*id),
            PseudoOp::DeclareVariable(id) => self.declare(*id),

            PseudoOp::Add
            | PseudoOp::Subtract
            | PseudoOp::Multiply
            | PseudoOp::Divide
            | PseudoOp::Mod => self.arithmetic(op),
            PseudoOp::Negate => self.negate(),
            PseudoOp::And | PseudoOp::Or => self.logical(op),
            PseudoOp::Not => self.not(),
            PseudoOp::Equal
            | PseudoOp::NotEqual
            | PseudoOp::Greater
            | PseudoOp::Less
            | PseudoOp::GreaterEqual
            | PseudoOp::LessEqual => self.compare(op),
            PseudoOp::BitOr | PseudoOp::BitAnd | PseudoOp::ShiftLeft | PseudoOp::ShiftRight => {
                self.bitwise(op)
            }
            PseudoOp::BitNot => self.bit_not(),

            PseudoOp::Jump(label) => {
                self.jump(OpCode::Jmp, *label, 0);
                Ok(())
            }
            PseudoOp::JumpIf(label) => self.conditional_jump(OpCode::JmpCv, *label),
            PseudoOp::JumpNotIf(label) => self.conditional_jump(OpCode::JmpCnv, *label),
            PseudoOp::Call(id) => Err(self.logic(format!(
                "function {id} cannot be called: functions have no machine lowering"
            ))),
            PseudoOp::Signal { kind, .. } => Err(self.logic(format!("stray {kind} signal"))),

            PseudoOp::SavePseudonym(name) => self.save_pseudonym(name),
            PseudoOp::LoadPseudonym(name) => self.load_pseudonym(name),
            PseudoOp::ReleasePseudonym(name) => self.release_pseudonym(name),

            PseudoOp::OpCodeStart => self.block_start(),
            PseudoOp::OpCodeEnd => self.block_end(),
            PseudoOp::OpCodeStoreVR { variable, source } => self.store_vr(*variable, source),
            PseudoOp::OpCodeLoadRV { register, variable } => self.load_rv(*register, *variable),
            PseudoOp::OpCodeCommand {
                opcode,
                destination,
                source0,
                source1,
                immediate,
            } => self.block_command(*opcode, *destination, *source0, *source1, *immediate),
        }
    }

    fn finish(mut self) -> Result<Program, LowerError> {
        self.emit(Instruction::bare(OpCode::Halt));
        let unresolved: Vec<PendingJump> = std::mem::take(&mut self.pending)
            .into_values()
            .flatten()
            .collect();
        if !unresolved.is_empty() {
            return Err(LowerError::UnresolvedJumps(unresolved));
        }
        debug!(instructions = self.output.len(), "byte lowering finished");
        Ok(Program::new(self.output))
    }

    // ---- Shared helpers ----

    fn emit(&mut self, instruction: Instruction) -> usize {
        trace!(
            ip = self.ip,
            at = self.output.len(),
            "emit {}",
            instruction.opcode.mnemonic()
        );
        self.output.push(instruction);
        self.output.len() - 1
    }

    fn diagnostic(&self, severity: Severity, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(severity, self.ip as u32, message)
    }

    fn logic(&self, message: impl Into<String>) -> Diagnostic {
        self.diagnostic(Severity::Logic, message)
    }

    fn type_error(&self, message: impl Into<String>) -> Diagnostic {
        self.diagnostic(Severity::Type, message)
    }

    fn allocate(&mut self) -> Result<usize, Diagnostic> {
        self.registers
            .allocate()
            .ok_or_else(|| self.logic("all machine registers are in use"))
    }

    fn pop_value(&mut self) -> Result<Value, Diagnostic> {
        self.values
            .pop()
            .ok_or_else(|| self.logic("no value to consume"))
    }

    /// Free the value's register unless a pseudonym holds it.
    fn release(&mut self, value: &Value) {
        if value.owns_register() {
            self.registers.release(value.register);
        }
    }

    /// A register the result of an operation on `value` may be written to.
    fn writable(&mut self, value: &Value) -> Result<usize, Diagnostic> {
        if value.owns_register() {
            Ok(value.register)
        } else {
            self.allocate()
        }
    }

    /// Bring `value` to `kind`. A value already of that kind is returned
    /// untouched.
    fn coerce(&mut self, value: Value, kind: NumericKind) -> Result<Value, Diagnostic> {
        let Some(conversion) = value.kind.conversion_to(kind) else {
            return Ok(value);
        };
        let register = if value.owns_register() {
            value.register
        } else {
            let copy = self.allocate()?;
            self.emit(Instruction::new(OpCode::MovRr, copy as u64, value.register as u64, 0));
            copy
        };
        self.emit(Instruction::new(conversion, register as u64, 0, 0));
        Ok(Value {
            register,
            kind,
            origin: Origin::Result,
        })
    }

    fn current_depth(&self) -> Option<usize> {
        self.frames.len().checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Literal;

    fn state_with_int(name: &str) -> (CompilationState, VariableId) {
        let mut state = CompilationState::new();
        let int = state.find_type("int").unwrap().id;
        state.push_scope();
        let id = state.declare_variable(name, int, false).unwrap();
        (state, id)
    }

    fn opcodes(program: &Program) -> Vec<OpCode> {
        program.instructions.iter().map(|i| i.opcode).collect()
    }

    #[test]
    fn halt_terminates_output() {
        let state = CompilationState::new();
        let mut diagnostics = Diagnostics::new();
        let program = lower(&state, &[], &mut diagnostics).unwrap();
        assert_eq!(opcodes(&program), vec![OpCode::Halt]);
    }

    #[test]
    fn same_kind_store_has_no_conversion() {
        let (state, x) = state_with_int("x");
        let ops = [
            PseudoOp::ScopeStart,
            PseudoOp::DeclareVariable(x),
            PseudoOp::Immediate(Literal::Int(3)),
            PseudoOp::Store(x),
            PseudoOp::ScopeEnd,
        ];
        let mut diagnostics = Diagnostics::new();
        let program = lower(&state, &ops, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(
            opcodes(&program),
            vec![
                OpCode::CreateFrame,
                OpCode::Push,
                OpCode::MovRiInt,
                OpCode::StoreLocal,
                OpCode::DestroyFrame,
                OpCode::Halt,
            ]
        );
    }

    #[test]
    fn float_into_int_converts_once() {
        let (state, x) = state_with_int("x");
        let ops = [
            PseudoOp::ScopeStart,
            PseudoOp::DeclareVariable(x),
            PseudoOp::Immediate(Literal::Float(2.5)),
            PseudoOp::Store(x),
        ];
        let mut diagnostics = Diagnostics::new();
        let program = lower(&state, &ops, &mut diagnostics).unwrap();
        let conversions = opcodes(&program)
            .into_iter()
            .filter(|op| *op == OpCode::TcDti)
            .count();
        assert_eq!(conversions, 1);
    }

    #[test]
    fn signal_is_fatal() {
        let state = CompilationState::new();
        let ops = [
            PseudoOp::Nop,
            PseudoOp::Signal {
                kind: crate::pseudo::SignalKind::Break,
                unwind: 0,
            },
        ];
        let mut diagnostics = Diagnostics::new();
        assert!(matches!(
            lower(&state, &ops, &mut diagnostics),
            Err(LowerError::UnrewrittenSignal { ip: 1, .. })
        ));
    }

    #[test]
    fn missing_label_lists_every_jump() {
        let state = CompilationState::new();
        let ops = [PseudoOp::Jump(7), PseudoOp::Nop, PseudoOp::Jump(7)];
        let mut diagnostics = Diagnostics::new();
        let Err(LowerError::UnresolvedJumps(jumps)) = lower(&state, &ops, &mut diagnostics) else {
            panic!("expected unresolved jumps");
        };
        assert_eq!(
            jumps,
            vec![
                PendingJump {
                    label: 7,
                    pseudo_ip: 0,
                    machine_ip: 0
                },
                PendingJump {
                    label: 7,
                    pseudo_ip: 2,
                    machine_ip: 1
                },
            ]
        );
    }

    #[test]
    fn backward_and_forward_jumps_resolve() {
        let state = CompilationState::new();
        let ops = [
            PseudoOp::Label {
                id: 0,
                mark: crate::pseudo::LabelMark::LoopStart,
            },
            PseudoOp::Jump(1),
            PseudoOp::Jump(0),
            PseudoOp::Label {
                id: 1,
                mark: crate::pseudo::LabelMark::LoopEnd,
            },
        ];
        let mut diagnostics = Diagnostics::new();
        let program = lower(&state, &ops, &mut diagnostics).unwrap();
        assert_eq!(program.instructions[0].destination, 2);
        assert_eq!(program.instructions[1].destination, 0);
    }

    #[test]
    fn registers_are_free_after_each_statement() {
        let (state, x) = state_with_int("x");
        let statements: Vec<Vec<PseudoOp>> = vec![
            vec![PseudoOp::DeclareVariable(x)],
            vec![
                PseudoOp::Load(x),
                PseudoOp::Immediate(Literal::Int(2)),
                PseudoOp::Immediate(Literal::Int(3)),
                PseudoOp::Multiply,
                PseudoOp::Add,
                PseudoOp::Store(x),
            ],
            vec![
                PseudoOp::Load(x),
                PseudoOp::Immediate(Literal::Float(1.5)),
                PseudoOp::Less,
                PseudoOp::Pop,
            ],
            vec![
                PseudoOp::Immediate(Literal::Uint(4)),
                PseudoOp::Negate,
                PseudoOp::BitNot,
                PseudoOp::Pop,
            ],
        ];
        let mut lowerer = ByteLowerer::new(&state);
        lowerer.lower_op(&PseudoOp::ScopeStart).unwrap();
        for statement in &statements {
            for op in statement {
                lowerer.lower_op(op).unwrap();
            }
            assert_eq!(lowerer.registers.busy_count(), 0, "{statement:?}");
            assert!(lowerer.values.is_empty());
        }
    }

    #[test]
    fn pseudonyms_survive_scope_end() {
        let state = CompilationState::new();
        let mut lowerer = ByteLowerer::new(&state);
        for op in [
            PseudoOp::ScopeStart,
            PseudoOp::Immediate(Literal::Int(9)),
            PseudoOp::SavePseudonym("limit".into()),
            PseudoOp::ScopeStart,
            PseudoOp::LoadPseudonym("limit".into()),
            PseudoOp::Immediate(Literal::Int(1)),
            PseudoOp::Add,
            PseudoOp::ScopeEnd,
        ] {
            lowerer.lower_op(&op).unwrap();
        }
        assert_eq!(lowerer.registers.busy_count(), 1);
        lowerer
            .lower_op(&PseudoOp::ReleasePseudonym("limit".into()))
            .unwrap();
        assert_eq!(lowerer.registers.busy_count(), 0);
        assert!(lowerer.registers.pseudonym("limit").is_none());
    }

    #[test]
    fn unmatched_scope_end_emits_nothing() {
        let state = CompilationState::new();
        let mut diagnostics = Diagnostics::new();
        let program = lower(&state, &[PseudoOp::ScopeEnd], &mut diagnostics).unwrap();
        assert_eq!(opcodes(&program), vec![OpCode::Halt]);
        assert_eq!(diagnostics.count(Severity::Logic), 1);
    }

    #[test]
    fn calls_are_reported() {
        let state = CompilationState::new();
        let mut diagnostics = Diagnostics::new();
        lower(&state, &[PseudoOp::Call(0)], &mut diagnostics).unwrap();
        assert_eq!(diagnostics.count(Severity::Logic), 1);
    }
}
