//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log Streamer - route log lines into batched streams
#[derive(Parser, Debug)]
#[command(
    name = "log-streamer",
    author,
    version,
    about = "Ship log lines to batched streams",
    long_about = "Routes log lines to named streams by source-file pattern, batches them \n\
                  per stream under record/byte limits and delivers each batch with \n\
                  partial-failure retry."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LOG_STREAMER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LOG_STREAMER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Level used when RUST_LOG is unset
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read lines from stdin and ship them
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Show which streams file identifiers route to
    Routes(RoutesArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "LOG_STREAMER_CONFIG"
    )]
    pub config: PathBuf,

    /// Treat every stdin line as coming from this file.
    ///
    /// Without it each line must be `<file_id>\t<payload>`.
    #[arg(long, env = "LOG_STREAMER_FILE_ID")]
    pub file_id: Option<String>,

    /// Channel buffer size between the stdin reader and the dispatcher
    #[arg(long, default_value = "1024", env = "LOG_STREAMER_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Prometheus metrics port (disabled when absent)
    #[arg(long, env = "LOG_STREAMER_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `routes` command
#[derive(Parser, Debug)]
pub struct RoutesArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// File identifiers to resolve
    #[arg(required = true)]
    pub file_ids: Vec<String>,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
