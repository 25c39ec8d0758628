//! Disassembler: program to canonical assembly text.
//!
//! One instruction per line, operands comma-separated. Trailing zero
//! operands past the opcode's arity are left out. Registers print as
//! `r<N>`, syscall numbers and single compare flags by name.

use malachite_common::{flags, Cell, Instruction, NumericKind, Program, SysCall};

use crate::layout::{layout, Field, Role};

/// Disassemble a program into canonical assembly text.
///
/// The output reassembles to an identical program
/// (`assemble(disassemble(program)) == program`).
pub fn disassemble(program: &Program) -> String {
    let mut text = String::new();
    for instruction in &program.instructions {
        text.push_str(&line(instruction));
        text.push('\n');
    }
    text
}

fn line(instruction: &Instruction) -> String {
    let layout = layout(instruction.opcode);
    let raw = |field: Field| match field {
        Field::Destination => instruction.destination,
        Field::Source0 => instruction.source0,
        Field::Source1 => instruction.source1,
        Field::Immediate => instruction.immediate.bits(),
    };

    let written = layout
        .order
        .iter()
        .rposition(|field| raw(*field) != 0)
        .map_or(0, |last| last + 1)
        .max(layout.arity);

    let operands: Vec<String> = layout.order[..written]
        .iter()
        .map(|field| match field {
            Field::Immediate => {
                immediate(instruction.immediate, instruction.opcode.immediate_kind())
            }
            _ => operand(raw(*field), layout.role(*field)),
        })
        .collect();

    let mnemonic = instruction.opcode.mnemonic();
    if operands.is_empty() {
        mnemonic.to_string()
    } else {
        format!("{mnemonic} {}", operands.join(", "))
    }
}

fn operand(value: u64, role: Role) -> String {
    match role {
        Role::Register => format!("r{value}"),
        Role::SysCall => match SysCall::try_from(value) {
            Ok(call) => call.name().to_string(),
            Err(_) => value.to_string(),
        },
        Role::FlagMask => flags::NAMED_FLAGS
            .iter()
            .find(|(_, bits)| u64::from(*bits) == value)
            .map_or_else(|| value.to_string(), |(name, _)| name.to_string()),
        Role::Value => value.to_string(),
    }
}

fn immediate(cell: Cell, kind: NumericKind) -> String {
    match kind {
        NumericKind::Int => cell.as_int().to_string(),
        NumericKind::Uint => cell.as_uint().to_string(),
        NumericKind::Double => {
            let value = cell.as_float();
            let text = format!("{value:?}");
            // Non-canonical NaN payloads only survive as raw bits.
            match text.parse::<f64>() {
                Ok(back) if back.to_bits() == cell.bits() => text,
                _ => format!("{:#x}", cell.bits()),
            }
        }
    }
}
