//! ETag consistency analysis.
//!
//! Partitions probe results by ETag value and turns the partition into a
//! three-level verdict. The largest group is taken as the reference value;
//! every host outside it is reported.

use crate::models::{FetchResult, Status, Verdict};
use serde::Serialize;
use std::collections::HashMap;

/// Hosts that returned the same ETag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EtagGroup {
    /// ETag value, compared byte for byte.
    pub etag: String,
    /// Hosts that returned it, in result order.
    pub hosts: Vec<String>,
}

/// Results split into ETag groups and failed hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EtagPartition {
    /// Groups sorted by host count descending, then ETag ascending.
    /// The first group is the reference.
    pub groups: Vec<EtagGroup>,
    /// Hosts that returned no ETag, in result order.
    pub failed_hosts: Vec<String>,
}

impl EtagPartition {
    /// Build the partition from a complete result set.
    ///
    /// ETags are not normalized: `"abc"`, `abc` and `W/"abc"` are three
    /// different groups.
    pub fn from_results(results: &[FetchResult]) -> Self {
        let mut by_etag: HashMap<&str, Vec<String>> = HashMap::new();
        let mut failed_hosts = Vec::new();

        for result in results {
            match result.etag.as_deref() {
                Some(etag) => by_etag.entry(etag).or_default().push(result.host.clone()),
                None => failed_hosts.push(result.host.clone()),
            }
        }

        let mut groups: Vec<EtagGroup> = by_etag
            .into_iter()
            .map(|(etag, hosts)| EtagGroup {
                etag: etag.to_string(),
                hosts,
            })
            .collect();

        // Equal-sized groups resolve to the smallest ETag so the reference
        // never depends on hash iteration order.
        groups.sort_by(|a, b| {
            b.hosts
                .len()
                .cmp(&a.hosts.len())
                .then_with(|| a.etag.cmp(&b.etag))
        });

        Self {
            groups,
            failed_hosts,
        }
    }

    /// The majority group, if any host returned an ETag.
    pub fn reference(&self) -> Option<&EtagGroup> {
        self.groups.first()
    }

    /// Hosts outside the reference group followed by failed hosts.
    pub fn invalid_hosts(&self) -> Vec<&str> {
        self.groups
            .iter()
            .skip(1)
            .flat_map(|g| g.hosts.iter())
            .chain(self.failed_hosts.iter())
            .map(String::as_str)
            .collect()
    }

    /// Classify the partition.
    pub fn verdict(&self) -> Verdict {
        match self.groups.as_slice() {
            [] => Verdict::new(Status::Warning, "no ETags"),
            [only] if self.failed_hosts.is_empty() => Verdict::new(
                Status::Ok,
                format!("{} identical ETags", only.hosts.len()),
            ),
            [_] => Verdict::new(
                Status::Warning,
                format!("no ETags from: {}", self.failed_hosts.join(" ")),
            ),
            _ => Verdict::new(
                Status::Critical,
                format!("invalid ETag on: {}", self.invalid_hosts().join(" ")),
            ),
        }
    }
}

/// Analyze a result set and produce the check verdict.
pub fn analyze(results: &[FetchResult]) -> Verdict {
    EtagPartition::from_results(results).verdict()
}
