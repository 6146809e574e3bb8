//! WV CLI - Vault export engine.
//!
//! Provides commands for:
//! - `export`: Export a vault into a static site
//! - `resume`: Re-enter an export halted by the memory governor
//! - `inspect`: Print site artifacts and progress state at the destination

mod commands;
mod error;
mod output;
mod reporter;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ExportArgs, InspectArgs, ResumeArgs};
use output::Output;

/// WV - Vault export engine.
#[derive(Parser)]
#[command(name = "wv", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a vault into a static site.
    Export(ExportArgs),
    /// Resume an export halted by the memory governor.
    Resume(ResumeArgs),
    /// Print site artifacts and progress state at the destination.
    Inspect(InspectArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // Only export and resume take --verbose
    let verbose = match &cli.command {
        Commands::Export(args) => args.verbose,
        Commands::Resume(args) => args.verbose,
        Commands::Inspect(_) => false,
    };

    // --verbose forces INFO; otherwise RUST_LOG decides
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Export(args) => args.execute(),
        Commands::Resume(args) => args.execute(),
        Commands::Inspect(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
