//! CLI parse: clap types for branchtree. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// branchtree - branch-aware directory tree snapshots
#[derive(Parser, Debug)]
#[command(name = "branchtree")]
#[command(about = "Serve directory trees that follow the repository's checked-out branch")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (where config.toml is looked up)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Build the tree for a directory and print it as JSON
    Read {
        /// Directory to read (default: repository.path)
        path: Option<PathBuf>,
        /// Single-line JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
    /// Print the effective configuration as TOML
    Config,
    /// Watch the repository and print tree events as JSON lines
    Watch {
        /// Directory to push trees for (default: repository.path)
        path: Option<PathBuf>,
        /// Debounce window in milliseconds (overrides watch.debounce_ms)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}
