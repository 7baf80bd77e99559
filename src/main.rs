use std::fs::{read_to_string, write};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parhl::runtime::{StdConsole, VirtualMachine, VmOptions};
use parhl::{CompileOptions, CompiledProgram, Compiler};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Parhl quadruple compiler and virtual machine")]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a compiled program document.
    Run {
        /// The compiled program (`func_dir` + `quads` JSON).
        #[clap(value_parser)]
        program: String,

        /// The maximum number of nested function calls.
        #[clap(long, value_parser, default_value = "1024")]
        max_call_depth: usize,
    },

    /// Compile a JSON-serialized AST into a program document.
    Compile {
        /// The serialized AST.
        #[clap(value_parser)]
        input: String,

        /// The file to write the program document to.
        #[clap(short, long, value_parser, default_value = "out.json")]
        output: String,

        /// Print the numbered quadruple listing.
        #[clap(short, long)]
        listing: bool,
    },
}

fn run(program: &str, max_call_depth: usize) -> anyhow::Result<()> {
    let program = CompiledProgram::load(program)
        .with_context(|| format!("could not load program {}", program))?;
    let options = VmOptions { max_call_depth };
    let mut vm = VirtualMachine::with_options(&program, StdConsole, options);
    vm.run()?;
    Ok(())
}

fn compile(input: &str, output: &str, listing: bool) -> anyhow::Result<()> {
    let source = read_to_string(input).with_context(|| format!("could not read {}", input))?;
    let compiled = Compiler::new(CompileOptions::default()).compile_json(&source)?;
    if listing {
        print!("{}", compiled.listing());
    }
    write(output, compiled.to_json()?).with_context(|| format!("could not write {}", output))?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let result = match args.command {
        Command::Run {
            program,
            max_call_depth,
        } => run(&program, max_call_depth),
        Command::Compile {
            input,
            output,
            listing,
        } => compile(&input, &output, listing),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
