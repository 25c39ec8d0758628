//! Malachite CLI: assemble, disassemble, compile and execute.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Input, usage or assembly error
//! - 2: Compile errors
//! - 3: Runtime fault

mod commands;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "malachite")]
#[command(about = "Malachite compiler back end and register VM", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// VM memory size in bytes
    #[arg(long, global = true)]
    memory_size: Option<usize>,

    /// VM heap size in bytes; the stack takes the rest
    #[arg(long, global = true)]
    heap_size: Option<usize>,

    /// Log at debug level to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble and execute a listing
    Run {
        /// Assembly listing (.masm)
        file: PathBuf,
    },

    /// Print the canonical listing of an assembly file
    Disasm {
        /// Assembly listing (.masm)
        file: PathBuf,
    },

    /// Compile a serialized syntax tree and print the machine listing
    Compile {
        /// Syntax tree as JSON
        file: PathBuf,
        /// Print the pseudo-instruction listing instead
        #[arg(long)]
        pseudo: bool,
    },

    /// Compile a serialized syntax tree and execute it
    Exec {
        /// Syntax tree as JSON
        file: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };
    init_logging(cli.verbose);

    let limits = commands::Limits {
        memory_size: cli.memory_size,
        heap_size: cli.heap_size,
    };
    let result = match &cli.command {
        Commands::Run { file } => commands::run(file, &limits),
        Commands::Disasm { file } => commands::disasm(file),
        Commands::Compile { file, pseudo } => commands::compile(file, *pseudo),
        Commands::Exec { file } => commands::exec(file, &limits),
    };

    let _ = io::stdout().flush();
    if let Err(code) = result {
        process::exit(code);
    }
}
