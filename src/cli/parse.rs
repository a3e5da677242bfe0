//! CLI parse: clap types for Cordon. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cordon CLI - run commands in a sandbox against disposable copies of your directories
#[derive(Parser)]
#[command(name = "cordon")]
#[command(about = "Run a command in an isolated sandbox and report what it changed")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (replaces the global config file)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug, mirrored to stderr)
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, global = true, default_value = "false", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (file, stderr, file+stderr)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command in the sandbox and report changes to the editable directories
    Run {
        /// Sandbox image
        #[arg(long)]
        image: String,
        /// Directory the command may modify (through a disposable copy); repeatable
        #[arg(long = "edit", value_name = "DIR")]
        edit: Vec<PathBuf>,
        /// User to run as inside the sandbox
        #[arg(long)]
        user: Option<String>,
        /// Report format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Command to run (after `--`)
        #[arg(last = true, value_name = "COMMAND")]
        command: Vec<String>,
    },
    /// Print the fingerprint and entry digests of a directory
    Snapshot {
        /// Directory to snapshot
        path: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}
