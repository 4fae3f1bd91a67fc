//! Status line and JSON report generation.
//!
//! The text form follows the Nagios plugin convention: a single line
//! `ETAGS <STATUS>: <message>` on stdout, with the exit code taken from
//! the status.

use crate::analysis::{EtagGroup, EtagPartition};
use crate::models::{Status, Verdict};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Service name prefixed to the status line.
const SERVICE: &str = "ETAGS";

/// Full outcome of one check run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub status: Status,
    pub message: String,
    /// When the probe finished.
    pub checked_at: DateTime<Utc>,
    /// URL requested from every host.
    pub url: String,
    /// Number of probed hosts.
    pub hosts: usize,
    pub duration_seconds: f64,
    /// ETag of the majority group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_etag: Option<String>,
    pub groups: Vec<EtagGroup>,
    pub failed_hosts: Vec<String>,
}

impl Report {
    /// Assemble a report from the analyzed partition.
    pub fn new(partition: EtagPartition, url: &str, hosts: usize, duration_seconds: f64) -> Self {
        let verdict = partition.verdict();

        Self {
            status: verdict.status,
            message: verdict.message,
            checked_at: Utc::now(),
            url: url.to_string(),
            hosts,
            duration_seconds,
            reference_etag: partition.reference().map(|g| g.etag.clone()),
            groups: partition.groups,
            failed_hosts: partition.failed_hosts,
        }
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::new(self.status, self.message.clone())
    }
}

/// Render a verdict as a Nagios status line.
pub fn status_line(verdict: &Verdict) -> String {
    format!("{} {}: {}", SERVICE, verdict.status, verdict.message)
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
