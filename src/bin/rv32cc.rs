//! Command-line driver (spec.md §6 "CLI"). The only place in this crate
//! allowed to call `std::process::exit` (via `ExitCode`) — every pass below
//! this point returns a `Result` and lets the caller decide.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::error;

use rv32cc_backend::context::CompilationContext;
use rv32cc_backend::error::CompileError;
use rv32cc_backend::frontend::compile_source;
use rv32cc_backend::target::Target;

#[derive(Parser)]
#[command(
    name = "rv32cc",
    about = "Compile the demo front end's input language to 32-bit RISC assembly",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Args {
    /// Assembly output path.
    #[arg(short = 'o', default_value = "output.asm")]
    output: PathBuf,

    /// Print usage and exit.
    #[arg(short = 'h', long = "help")]
    help: bool,

    /// Print version and target name and exit.
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Exactly one input file is accepted; more is an error.
    inputs: Vec<PathBuf>,
}

fn print_usage() {
    let _ = Args::command().print_help();
    println!();
}

fn print_version() {
    let target = Target::riscv32_reference();
    println!("{} {} ({})", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), target.name);
}

fn run(input: &PathBuf, output: &PathBuf) -> Result<()> {
    let source = fs::read_to_string(input).map_err(|source| CompileError::Input {
        path: input.clone(),
        source,
    })?;

    let program = compile_source(input, &source)?;
    let ctx = CompilationContext::new(Target::riscv32_reference());
    let asm = ctx.compile(program, Some(output.as_path()))?;

    fs::write(output, asm).map_err(|source| CompileError::Output {
        path: output.clone(),
        source,
    })?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };

    if args.help {
        print_usage();
        return ExitCode::FAILURE;
    }
    if args.version {
        print_version();
        return ExitCode::FAILURE;
    }
    if args.inputs.len() != 1 {
        print_usage();
        return ExitCode::FAILURE;
    }

    match run(&args.inputs[0], &args.output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
