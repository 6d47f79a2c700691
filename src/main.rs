use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_chrome::{ChromeLayerBuilder, FlushGuard};
use tracing_subscriber::prelude::*;

use mockx64::{assembler::assemble, source::read_source, vm};

#[derive(Parser)]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[clap(long)]
    #[clap(help = "Enable chrome tracing")]
    #[clap(long_help = "Enable chrome tracing which on program exit will generate
a json file to be opened with a chrome tracing compatible
viewer.")]
    trace: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RunArgs {
    #[clap(help = "Path to the program file")]
    path: String,
}

#[derive(Args)]
struct DebugArgs {
    #[clap(help = "Path to the program file")]
    path: String,
}

#[derive(Subcommand)]
enum Command {
    #[clap(about = "Run a program and print its result")]
    #[clap(alias = "r")]
    Run(RunArgs),
    #[clap(about = "Step through a program in the debugger")]
    #[clap(aliases = &["d", "dbg"])]
    Debug(DebugArgs),
}

pub fn trace() -> FlushGuard {
    let (chrome_layer, guard) = ChromeLayerBuilder::new().build();
    tracing_subscriber::registry().with(chrome_layer).init();

    guard
}

fn run(args: &RunArgs) -> Result<()> {
    let source = read_source(&args.path)?;
    let program = assemble(&source)?;
    if let Some(value) = vm::run(program)? {
        println!("{}", value);
    }
    Ok(())
}

fn debug(args: &DebugArgs) -> Result<()> {
    let source = read_source(&args.path)?;
    let program = assemble(&source)?;
    vm::tui::run(&source, program)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _trace_guard = if cli.trace { Some(trace()) } else { None };

    match &cli.command {
        Command::Run(args) => run(args),
        Command::Debug(args) => debug(args),
    }
}
