//! Command-line interface for the mailsender operator binary.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format for log aggregation.
    Json,
}

/// Check configuration and prepare the mail queue tables.
#[derive(Parser, Debug)]
#[command(name = "mailsender")]
#[command(version)]
#[command(about = "Check configuration and prepare the mail queue tables")]
pub struct Cli {
    /// Path to configuration file.
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Validate configuration and exit (the default action).
    #[arg(long = "validate", conflicts_with = "init_schema")]
    pub validate: bool,

    /// Create the body and head tables if they do not exist, then exit.
    #[arg(long = "init-schema")]
    pub init_schema: bool,

    /// Log format: text or json.
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, env = "LOG_FORMAT")]
    pub log_format: LogFormat,
}
