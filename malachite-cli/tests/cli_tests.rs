//! Integration tests for the Malachite CLI.
//!
//! These tests invoke the `malachite` binary as a subprocess and check
//! exit codes, stdout, and stderr.

use assert_cmd::Command;
use malachite_compiler::{Keyword, Literal, Node, Operator, ScopeWrap, Token};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[allow(deprecated)]
fn malachite() -> Command {
    Command::cargo_bin("malachite").unwrap()
}

/// Return the absolute path to a test program file.
fn test_program(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/programs")
        .join(name)
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// `int x = <lhs> + <rhs>` followed by an opcode block printing `<var>`.
fn tree(lhs: i64, rhs: i64, var: &str) -> Node {
    let declaration = Node::leaf(vec![
        Token::type_marker("int", 1),
        Token::identifier("x", 1),
        Token::operator(Operator::Assign, 1),
        Token::literal(Literal::Int(lhs), 1),
        Token::operator(Operator::Add, 1),
        Token::literal(Literal::Int(rhs), 1),
    ]);
    let print = Node::headed(
        vec![Token::keyword(Keyword::OpCode, 2)],
        vec![
            Node::leaf(vec![
                Token::identifier("LOAD_RV", 3),
                Token::identifier("RA", 3),
                Token::delimiter(',', 3),
                Token::identifier(var, 3),
            ]),
            Node::leaf(vec![
                Token::identifier("OP_SYSTEM_CALL", 4),
                Token::identifier("PRINT_INT", 4),
                Token::delimiter(',', 4),
                Token::identifier("RA", 4),
            ]),
        ],
        ScopeWrap::Bare,
    );
    Node::root(vec![declaration, print])
}

fn tree_file(dir: &TempDir, root: &Node) -> PathBuf {
    write_file(dir, "tree.json", &serde_json::to_string(root).unwrap())
}

// ---- No-args / help ----

#[test]
fn no_args_prints_usage_and_exits_1() {
    malachite()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Usage: malachite"));
}

#[test]
fn help_flag_exits_0() {
    malachite()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Commands:"));
}

#[test]
fn unknown_command_exits_1() {
    malachite().arg("frobnicate").assert().failure().code(1);
}

// ---- Run ----

#[test]
fn run_countdown() {
    malachite()
        .args(["run", test_program("countdown.masm").to_str().unwrap()])
        .assert()
        .success()
        .stdout("3 2 1 ");
}

#[test]
fn run_missing_file() {
    malachite()
        .args(["run", "/nonexistent/program.masm"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn run_fault_exits_3() {
    malachite()
        .args(["run", test_program("divide_by_zero.masm").to_str().unwrap()])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("division by zero at instruction 2"));
}

#[test]
fn run_assembly_error_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "bad.masm", "OP_HALT\nOP_WHAT r0\n");
    malachite()
        .args(["run", input.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("line 2: unknown opcode 'OP_WHAT'"));
}

#[test]
fn run_with_memory_flags() {
    malachite()
        .args([
            "run",
            test_program("countdown.masm").to_str().unwrap(),
            "--memory-size",
            "4096",
            "--heap-size",
            "1024",
        ])
        .assert()
        .success()
        .stdout("3 2 1 ");
}

#[test]
fn heap_not_smaller_than_memory_exits_1() {
    malachite()
        .args([
            "run",
            test_program("countdown.masm").to_str().unwrap(),
            "--memory-size",
            "1024",
            "--heap-size",
            "1024",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("heap size"));
}

// ---- Disasm ----

#[test]
fn disasm_prints_canonical_listing() {
    malachite()
        .args(["disasm", test_program("countdown.masm").to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("OP_MOV_RI_INT r4, 32\n"))
        .stdout(predicate::str::contains("OP_GET_FLAG r3, GREATER\n"))
        .stdout(predicate::str::contains("OP_JMP_CV 4, r3\n"));
}

// ---- Compile / exec ----

#[test]
fn compile_prints_machine_listing() {
    let dir = TempDir::new().unwrap();
    let input = tree_file(&dir, &tree(40, 2, "x"));
    malachite()
        .args(["compile", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("OP_CREATE_FRAME\n"))
        .stdout(predicate::str::ends_with("OP_HALT\n"));
}

#[test]
fn compile_pseudo_listing() {
    let dir = TempDir::new().unwrap();
    let input = tree_file(&dir, &tree(40, 2, "x"));
    malachite()
        .args(["compile", "--pseudo", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("DeclareVariable variable:0"))
        .stdout(predicate::str::contains("OpCodeStart"));
}

#[test]
fn exec_runs_compiled_tree() {
    let dir = TempDir::new().unwrap();
    let input = tree_file(&dir, &tree(40, 2, "x"));
    malachite()
        .args(["exec", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout("42");
}

#[test]
fn compile_errors_exit_2() {
    let dir = TempDir::new().unwrap();
    let input = tree_file(&dir, &tree(40, 2, "missing"));
    malachite()
        .args(["exec", input.to_str().unwrap()])
        .assert()
        .failure()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains("type error"));
}

#[test]
fn invalid_tree_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "tree.json", "{ not json");
    malachite()
        .args(["compile", input.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid syntax tree"));
}

#[test]
fn verbose_logs_to_stderr() {
    let dir = TempDir::new().unwrap();
    let input = tree_file(&dir, &tree(1, 2, "x"));
    malachite()
        .args(["-v", "exec", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout("3")
        .stderr(predicate::str::contains("compiled"));
}
