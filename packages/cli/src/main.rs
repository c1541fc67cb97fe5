mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{lock, substitute, LockArgs, SubstituteArgs};
use tracing_subscriber::EnvFilter;

/// Regionlock CLI - lock document regions and bind text to document properties
#[derive(Parser, Debug)]
#[command(name = "regionlock")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log every match and grant
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Make everything editable except the named regions kept locked
    Lock(LockArgs),

    /// Replace literal text with document property fields
    Substitute(SubstituteArgs),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Command::Lock(args) => lock(args, &cwd),
        Command::Substitute(args) => substitute(args, &cwd),
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
