//! `pagetree` binary entry point.
//!
//! A thin wrapper around the pagetree library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging (to stderr, so query output stays clean)
//! 3. Dispatches to the subcommand handler

mod cli;
mod commands;
mod ingest;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Build(args) => commands::build(&args, cli.format),
        Commands::Get { index, key } => commands::get(&index, key, cli.format),
        Commands::Range { index, min, max } => commands::range(&index, min, max, cli.format),
        Commands::Info { index } => commands::info(&index, cli.format),
        Commands::Verify { index } => commands::verify(&index, cli.format),
        Commands::Dot { index, depth } => commands::dot(&index, depth),
    }
}
