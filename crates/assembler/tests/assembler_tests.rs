//! Integration tests for the Malachite assembler.
//!
//! Tests cover:
//! - Hand-written listings assembled and executed on the VM
//! - Roundtrip properties (disassemble → assemble) over arbitrary instructions
//! - Error cases with line numbers

use malachite_assembler::{assemble, disassemble, AsmError};
use malachite_common::opcode::ALL_OPCODES;
use malachite_common::{Cell, Instruction, OpCode, Program};
use malachite_vm::{run_captured, ErrorKind, Fault, Termination, VM};
use proptest::prelude::*;

// ---- Test helpers ----

fn run_text(text: &str) -> (Result<Termination, Fault>, String) {
    let program = assemble(text).unwrap_or_else(|err| panic!("assembly failed: {err}"));
    run_captured(&program)
}

// ---- Programs ----

#[test]
fn hello_chars() {
    let text = "\
OP_MOV_RI_INT r0, 'h'
OP_SYSTEM_CALL PRINT_CHAR, r0
OP_MOV_RI_INT r0, 'i'
OP_SYSTEM_CALL PRINT_CHAR, r0
OP_HALT
";
    let (result, output) = run_text(text);
    assert_eq!(result, Ok(Termination::Halted { at: 4 }));
    assert_eq!(output, "hi");
}

#[test]
fn countdown_loop() {
    // r0 counts from 3 down to 1, printing each value.
    let text = "\
OP_MOV_RI_INT r0, 3      ; 0
OP_MOV_RI_INT r1, 1      ; 1
OP_MOV_RI_INT r2, 0      ; 2
OP_SYSTEM_CALL PRINT_INT, r0  ; 3
OP_ISUB_RRR r0, r0, r1   ; 4
OP_CMP_RR 0, r0, r2      ; 5
OP_GET_FLAG r3, GREATER  ; 6
OP_JMP_CV 3, r3          ; 7
OP_HALT                  ; 8
";
    let (result, output) = run_text(text);
    assert_eq!(result, Ok(Termination::Halted { at: 8 }));
    assert_eq!(output, "321");
}

#[test]
fn frames_and_locals() {
    let text = "\
OP_CREATE_FRAME
OP_PUSH 8
OP_MOV_RI_INT r0, 77
OP_STORE_LOCAL 0, r0, 8
OP_LOAD_LOCAL r1, 0, 8
OP_SYSTEM_CALL PRINT_INT, r1
OP_DESTROY_FRAME
OP_HALT
";
    let (result, output) = run_text(text);
    assert!(result.is_ok());
    assert_eq!(output, "77");
}

#[test]
fn double_arithmetic() {
    let text = "\
OP_MOV_RI_DOUBLE r0, 1.5
OP_MOV_RI_DOUBLE r1, 2.25
OP_DMUL_RRR r2, r0, r1
OP_SYSTEM_CALL PRINT_DOUBLE, r2
";
    let (result, output) = run_text(text);
    assert_eq!(result, Ok(Termination::Finished));
    assert_eq!(output.parse::<f64>().unwrap(), 3.375);
}

#[test]
fn division_by_zero_reports_instruction() {
    let text = "\
OP_MOV_RI_INT r0, 10
OP_MOV_RI_INT r1, 0
OP_IDIV_RRR r2, r0, r1
OP_HALT
";
    let (result, _) = run_text(text);
    assert_eq!(
        result,
        Err(Fault {
            kind: ErrorKind::ZeroDivision,
            ip: 2
        })
    );
}

#[test]
fn halt_resumes_on_next_execute() {
    let text = "\
OP_MOV_RI_INT r0, 1
OP_SYSTEM_CALL PRINT_INT, r0
OP_HALT
OP_MOV_RI_INT r0, 2
OP_SYSTEM_CALL PRINT_INT, r0
OP_HALT
";
    let program = assemble(text).unwrap();
    let mut output = Vec::new();
    {
        let mut vm = VM::new(&program).with_output(&mut output);
        assert_eq!(vm.execute(), Ok(Termination::Halted { at: 2 }));
        assert_eq!(vm.execute(), Ok(Termination::Halted { at: 5 }));
    }
    assert_eq!(String::from_utf8(output).unwrap(), "12");
}

// ---- Canonical text ----

#[test]
fn canonical_listing() {
    let text = "op_mov_ri_int 0 -3\nop_tc_itd_r 0\nop_jmp_cnv 9 r4\n";
    let program = assemble(text).unwrap();
    assert_eq!(
        disassemble(&program),
        "OP_MOV_RI_INT r0, -3\nOP_TC_ITD_R r0\nOP_JMP_CNV 9, r4\n"
    );
}

#[test]
fn enclosing_access_keeps_packed_operand() {
    let packed = malachite_common::limits::pack_size_depth(8, 1);
    let program = Program::new(vec![Instruction::new(OpCode::LoadEnclosingA, 3, 16, packed)]);
    let text = disassemble(&program);
    assert_eq!(text, format!("OP_LOAD_ENCLOSING_A r3, 16, {packed}\n"));
    assert_eq!(assemble(&text).unwrap(), program);
}

// ---- Errors ----

#[test]
fn errors_carry_lines() {
    let cases = [
        ("OP_HALT\nOP_NOPE\n", 2),
        ("OP_HALT\nOP_HALT\nOP_JMP 0xQQ\n", 3),
        ("OP_JMP 1 2 3 4 5\n", 1),
        ("OP_JMP somewhere\n", 1),
    ];
    for (text, line) in cases {
        let err = assemble(text).unwrap_err();
        assert_eq!(err.line(), line, "{text:?} -> {err}");
    }
}

#[test]
fn too_many_operands_names_opcode() {
    let err = assemble("OP_RET 1 2 3 4 5").unwrap_err();
    assert_eq!(
        err,
        AsmError::TooManyOperands {
            line: 1,
            opcode: "OP_RET",
            count: 5
        }
    );
}

#[test]
fn float_in_register_slot_rejected() {
    let err = assemble("OP_IADD_RRR r0, 1.5, r1").unwrap_err();
    assert!(matches!(err, AsmError::InvalidNumber { line: 1, .. }));
}

// ---- Properties ----

fn arb_instruction() -> impl Strategy<Value = Instruction> {
    (
        prop::sample::select(&ALL_OPCODES[..]),
        prop_oneof![0u64..300, any::<u64>()],
        prop_oneof![0u64..300, any::<u64>()],
        prop_oneof![Just(0u64), any::<u64>()],
        prop_oneof![Just(0u64), any::<u64>()],
    )
        .prop_map(|(opcode, destination, source0, source1, bits)| Instruction {
            opcode,
            destination,
            source0,
            source1,
            immediate: Cell::from_bits(bits),
        })
}

proptest! {
    #[test]
    fn disassembly_reassembles(instructions in prop::collection::vec(arb_instruction(), 0..32)) {
        let program = Program::new(instructions);
        let text = disassemble(&program);
        prop_assert_eq!(assemble(&text).unwrap(), program);
    }

    #[test]
    fn canonical_text_is_a_fixed_point(
        instructions in prop::collection::vec(arb_instruction(), 0..16),
    ) {
        let text = disassemble(&Program::new(instructions));
        let again = disassemble(&assemble(&text).unwrap());
        prop_assert_eq!(again, text);
    }
}
