//! CLI command implementations.
//!
//! Each command reports its own errors on stderr and returns the exit code
//! to use on failure.

use std::fs;
use std::path::Path;

use malachite_common::Program;
use malachite_compiler::{listing, Compilation, Node};
use malachite_vm::{Termination, VmConfig, VM};
use tracing::debug;

/// VM size overrides from the command line.
pub struct Limits {
    pub memory_size: Option<usize>,
    pub heap_size: Option<usize>,
}

impl Limits {
    fn config(&self) -> VmConfig {
        let defaults = VmConfig::default();
        VmConfig {
            memory_size: self.memory_size.unwrap_or(defaults.memory_size),
            heap_size: self.heap_size.unwrap_or(defaults.heap_size),
            ..defaults
        }
    }
}

/// Assemble a listing and execute it.
pub fn run(path: &Path, limits: &Limits) -> Result<(), i32> {
    let program = assemble_file(path)?;
    execute(&program, limits)
}

/// Print the canonical listing of an assembly file.
pub fn disasm(path: &Path) -> Result<(), i32> {
    let program = assemble_file(path)?;
    print!("{}", malachite_assembler::disassemble(&program));
    Ok(())
}

/// Compile a serialized tree and print the machine or pseudo listing.
pub fn compile(path: &Path, pseudo: bool) -> Result<(), i32> {
    let compilation = compile_file(path)?;
    if pseudo {
        print!("{}", listing(&compilation.pseudo));
    } else {
        print!("{}", malachite_assembler::disassemble(&compilation.program));
    }
    if compilation.diagnostics.has_errors() {
        return Err(2);
    }
    Ok(())
}

/// Compile a serialized tree and execute it. Nothing runs if the compile
/// reported errors.
pub fn exec(path: &Path, limits: &Limits) -> Result<(), i32> {
    let compilation = compile_file(path)?;
    if compilation.diagnostics.has_errors() {
        return Err(2);
    }
    execute(&compilation.program, limits)
}

fn read_text(path: &Path) -> Result<String, i32> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("error: cannot read '{}': {e}", path.display());
        1
    })
}

fn assemble_file(path: &Path) -> Result<Program, i32> {
    let text = read_text(path)?;
    malachite_assembler::assemble(&text).map_err(|e| {
        eprintln!("error: {e}");
        1
    })
}

/// Read, compile and report diagnostics. A fatal lowering error is exit 2.
fn compile_file(path: &Path) -> Result<Compilation, i32> {
    let text = read_text(path)?;
    let root: Node = serde_json::from_str(&text).map_err(|e| {
        eprintln!("error: invalid syntax tree: {e}");
        1
    })?;

    match malachite_compiler::compile(&root) {
        Ok(compilation) => {
            for diagnostic in compilation.diagnostics.iter() {
                eprintln!("{diagnostic}");
            }
            debug!(
                instructions = compilation.program.len(),
                diagnostics = compilation.diagnostics.len(),
                "compiled"
            );
            Ok(compilation)
        }
        Err(err) => {
            for diagnostic in err.diagnostics.iter() {
                eprintln!("{diagnostic}");
            }
            eprintln!("error: {err}");
            Err(2)
        }
    }
}

fn execute(program: &Program, limits: &Limits) -> Result<(), i32> {
    let mut vm = VM::with_config(program, limits.config()).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;
    match vm.execute() {
        Ok(Termination::Halted { at }) => {
            debug!(at, "halted");
            Ok(())
        }
        Ok(Termination::Finished) => Ok(()),
        Err(fault) => {
            eprintln!("runtime error: {fault}");
            Err(3)
        }
    }
}
