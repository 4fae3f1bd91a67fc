//! Data models for the ETag consistency check.
//!
//! This module contains the values passed between the probe dispatcher,
//! the consistency analyzer and the report renderer.

use serde::Serialize;
use std::fmt;

/// Outcome of probing a single host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchResult {
    /// Host the request was routed through.
    pub host: String,
    /// ETag returned by the host, `None` if the probe failed.
    pub etag: Option<String>,
}

impl FetchResult {
    /// Creates a result for a host that answered with an ETag.
    pub fn found(host: impl Into<String>, etag: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            etag: Some(etag.into()),
        }
    }

    /// Creates a result for a host that did not yield an ETag.
    pub fn failed(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            etag: None,
        }
    }
}

/// Check status, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Every host agrees on the ETag
    Ok,
    /// Degraded: some or all hosts returned no ETag
    Warning,
    /// ETags diverge across hosts
    Critical,
    /// The check itself could not run
    Unknown,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::Warning => write!(f, "WARNING"),
            Status::Critical => write!(f, "CRITICAL"),
            Status::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl Status {
    /// Process exit code under the Nagios plugin convention.
    pub fn exit_code(&self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }
}

/// Final result of a check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub status: Status,
    pub message: String,
}

impl Verdict {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Split a comma-separated host list into probe targets.
///
/// Entries are kept verbatim, including duplicates and empty entries; an
/// unusable host simply fails its probe.
pub fn parse_hosts(servers: &str) -> Vec<String> {
    servers.split(',').map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(Status::Ok < Status::Warning);
        assert!(Status::Warning < Status::Critical);
        assert!(Status::Critical < Status::Unknown);
    }

    #[test]
    fn test_status_exit_codes() {
        assert_eq!(Status::Ok.exit_code(), 0);
        assert_eq!(Status::Warning.exit_code(), 1);
        assert_eq!(Status::Critical.exit_code(), 2);
        assert_eq!(Status::Unknown.exit_code(), 3);
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&Status::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");
    }

    #[test]
    fn test_parse_hosts() {
        assert_eq!(parse_hosts("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_hosts("a,a"), vec!["a", "a"]);
        assert_eq!(parse_hosts("single"), vec!["single"]);
        assert_eq!(parse_hosts(""), vec![""]);
    }
}
