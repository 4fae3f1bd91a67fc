//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.etagcheck.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// File name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".etagcheck.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Probe settings.
    #[serde(default)]
    pub probe: ProbeConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Output format of the check result.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Fleet probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// URL requested from every host.
    #[serde(default = "default_url")]
    pub url: String,

    /// Maximum number of concurrent HTTP requests.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Port the hosts accept proxied requests on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Name of the header marking requests as health probes.
    #[serde(default = "default_header_name")]
    pub header_name: String,

    /// Value of the health probe header.
    #[serde(default = "default_header_value")]
    pub header_value: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            concurrency: default_concurrency(),
            timeout_seconds: default_timeout(),
            port: default_port(),
            header_name: default_header_name(),
            header_value: default_header_value(),
        }
    }
}

fn default_url() -> String {
    "http://stalker.wikia.com/wiki/Main_Page".to_string()
}

fn default_concurrency() -> usize {
    100
}

fn default_timeout() -> u64 {
    10
}

fn default_port() -> u16 {
    80
}

fn default_header_name() -> String {
    "X-Wikia-Internal-Request".to_string()
}

fn default_header_value() -> String {
    "nagios".to_string()
}

/// A configuration value that cannot be used for a probe run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("Timeout must be at least 1 second")]
    ZeroTimeout,

    #[error("Port must not be 0")]
    ZeroPort,

    #[error("URL must start with 'http://' or 'https://': {0}")]
    InvalidUrl(String),

    #[error("Invalid probe header: {0}")]
    InvalidHeader(String),
}

impl ProbeConfig {
    /// Check the merged settings before probing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }

        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.url.clone()));
        }

        if HeaderName::from_bytes(self.header_name.as_bytes()).is_err()
            || HeaderValue::from_str(&self.header_value).is_err()
        {
            return Err(ConfigError::InvalidHeader(format!(
                "{}: {}",
                self.header_name, self.header_value
            )));
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the working directory.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.etagcheck.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.url {
            self.probe.url = url.clone();
        }
        if let Some(concurrency) = args.concurrent {
            self.probe.concurrency = concurrency;
        }
        if let Some(timeout) = args.timeout {
            self.probe.timeout_seconds = timeout;
        }
        if let Some(port) = args.port {
            self.probe.port = port;
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level from CLI flags, raised to DEBUG by `general.verbose`.
    ///
    /// `--quiet` always wins.
    pub fn log_level(&self, args: &crate::cli::Args) -> tracing::Level {
        if self.general.verbose && !args.quiet {
            tracing::Level::DEBUG
        } else {
            args.log_level()
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
