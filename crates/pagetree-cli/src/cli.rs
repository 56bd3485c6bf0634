//! Command-line definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pagetree",
    about = "Build and query immutable paged tree index files",
    version,
    long_about = "Builds a compact paged index from CSV rows of `key,data[,aux]` and answers point lookups and range scans against it without loading the whole file."
)]
pub struct Cli {
    /// Output format
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON output
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build an index file from CSV rows
    Build(BuildArgs),

    /// Look up a single key
    Get {
        /// Index file
        index: PathBuf,
        /// Key to look up
        key: u64,
    },

    /// List every entry with min <= key <= max
    Range {
        /// Index file
        index: PathBuf,
        /// Smallest key (inclusive)
        min: u64,
        /// Largest key (inclusive)
        max: u64,
    },

    /// Show header fields and meta-data
    Info {
        /// Index file
        index: PathBuf,
    },

    /// Walk the whole tree and check its structure
    Verify {
        /// Index file
        index: PathBuf,
    },

    /// Render the page tree as GraphViz source
    Dot {
        /// Index file
        index: PathBuf,
        /// Number of levels to draw, root included
        #[arg(long)]
        depth: Option<usize>,
    },
}

#[derive(Debug, clap::Args)]
pub struct BuildArgs {
    /// CSV file with `key,data[,aux]` rows
    #[arg(short, long)]
    pub input: PathBuf,

    /// Destination index file
    #[arg(short = 'O', long)]
    pub output: PathBuf,

    /// Slots per page; overrides the configuration file
    #[arg(long, env = "PAGETREE_CAPACITY")]
    pub capacity: Option<usize>,

    /// JSON build configuration
    #[arg(long, env = "PAGETREE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Meta-data line stored in the header (repeatable)
    #[arg(long = "meta")]
    pub meta: Vec<String>,

    /// Skip the first CSV row
    #[arg(long)]
    pub has_headers: bool,
}
