//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// etagcheck - ETag consistency check for a fleet of HTTP servers
///
/// Requests the same URL through every server and compares the ETag
/// headers they return. Reports OK, WARNING or CRITICAL following the
/// Nagios plugin convention (exit codes 0, 1, 2; 3 for UNKNOWN).
///
/// Examples:
///   etagcheck web-01,web-02,web-03
///   etagcheck web-01,web-02 --url http://www.example.org/ -c 10 -t 5
///   etagcheck web-01,web-02 --format json
///   etagcheck --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Comma-separated list of HTTP servers
    #[arg(value_name = "SERVERS", required_unless_present = "init_config")]
    pub servers: Option<String>,

    /// Max number of concurrent HTTP requests [default: 100]
    #[arg(short = 'c', long, value_name = "NUM")]
    pub concurrent: Option<usize>,

    /// Timeout for HTTP requests in seconds [default: 10]
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// URL requested through every server
    ///
    /// Default: http://stalker.wikia.com/wiki/Main_Page
    #[arg(short, long, value_name = "URL", env = "ETAGCHECK_URL")]
    pub url: Option<String>,

    /// Port the servers accept proxied requests on [default: 80]
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .etagcheck.toml in the current directory
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .etagcheck.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the check result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Single Nagios status line (default)
    #[default]
    Text,
    /// JSON report with per-ETag groups
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The raw server list, empty if not given.
    pub fn servers(&self) -> &str {
        self.servers.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.servers.is_none() {
            return Err("A comma-separated list of servers is required".to_string());
        }

        if self.concurrent == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(ref url) = self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref config_path) = self.config {
            if !config_path.is_file() {
                return Err(format!(
                    "Config file does not exist: {}",
                    config_path.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        }
    }
}
