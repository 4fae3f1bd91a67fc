//! Fleet probing.
//!
//! This module fetches the ETag for one URL from every host of a fleet,
//! routing each request through the host itself.

pub mod client;
pub mod dispatcher;

#[cfg(test)]
pub(crate) mod testing;

pub use client::fetch_etag;
pub use dispatcher::{effective_workers, fetch};

/// Settings for one probe run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// URL requested from every host.
    pub url: String,
    /// Maximum number of concurrent requests.
    pub concurrency: usize,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// Port the hosts accept proxied requests on.
    pub port: u16,
    /// Header marking the request as a health probe.
    pub header_name: String,
    pub header_value: String,
}

impl From<&crate::config::ProbeConfig> for FetchConfig {
    fn from(config: &crate::config::ProbeConfig) -> Self {
        Self {
            url: config.url.clone(),
            concurrency: config.concurrency,
            timeout_seconds: config.timeout_seconds,
            port: config.port,
            header_name: config.header_name.clone(),
            header_value: config.header_value.clone(),
        }
    }
}

impl FetchConfig {
    /// Proxy address used to reach `host`.
    pub fn proxy_url(&self, host: &str) -> String {
        format!("http://{}:{}", host, self.port)
    }
}
