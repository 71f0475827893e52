//! # jsref CLI entry point
//!
//! Parses command-line arguments, builds the shared schema loader and
//! dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jsref_cli::check::{run_check, CheckArgs};
use jsref_cli::pointer::{run_pointer, PointerArgs};
use jsref_cli::resolve::{run_resolve, ResolveArgs};
use jsref_cli::{build_loader, LoaderOptions};

/// jsref — JSON Schema reference resolution toolkit.
///
/// Addresses documents with JSON Pointers, follows `$ref` chains across
/// files and URLs, and checks that every reference in a schema resolves.
#[derive(Parser, Debug)]
#[command(name = "jsref", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a loader settings file (YAML, or JSON with a .json extension).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index every `id` in loaded documents (inline dereferencing).
    #[arg(long, global = true)]
    inline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the value a JSON Pointer addresses in a document.
    Pointer(PointerArgs),

    /// Follow a `$ref` chain and print the node it ends on.
    Resolve(ResolveArgs),

    /// Resolve every `$ref` in a schema and report failures.
    Check(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("jsref CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let options = LoaderOptions {
        config: cli.config,
        inline: cli.inline,
    };
    let result = build_loader(&options).and_then(|loader| match &cli.command {
        Commands::Pointer(args) => run_pointer(args, &loader),
        Commands::Resolve(args) => run_resolve(args, &loader),
        Commands::Check(args) => run_check(args, &loader),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
