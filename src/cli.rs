//! Command-line arguments.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// rosterd - student and course records sidecar
///
/// Reads one JSON request per line on stdin and answers on stdout.
/// Logs go to stderr.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Workspace directory to open at startup
    #[arg(long, value_name = "DIR", env = "ROSTERD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Config file; defaults to <workspace>/rosterd.toml when present
    #[arg(long, value_name = "FILE", env = "ROSTERD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "rosterd=info", env = "ROSTERD_LOG")]
    pub log_level: String,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}
