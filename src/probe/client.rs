//! HTTP probe for a single host.

use super::FetchConfig;
use reqwest::{header, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Why a host yielded no ETag.
///
/// The analysis only cares whether an ETag is present; the cause is kept for
/// logging.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot use {proxy} as proxy: {source}")]
    Client {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("response has no ETag header")]
    MissingEtag,
}

impl ProbeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Transport(e) if e.is_timeout())
    }
}

/// Fetch the configured URL through `host` and return its ETag.
///
/// Only an exact 200 counts. The first ETag value is returned verbatim,
/// quotes and weak prefix included.
pub async fn fetch_etag(host: &str, config: &FetchConfig) -> Result<String, ProbeError> {
    let proxy_url = config.proxy_url(host);

    let client = reqwest::Proxy::all(&proxy_url)
        .and_then(|proxy| {
            reqwest::Client::builder()
                .proxy(proxy)
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
        })
        .map_err(|source| ProbeError::Client {
            proxy: proxy_url.clone(),
            source,
        })?;

    let response = client
        .get(&config.url)
        .header(config.header_name.as_str(), config.header_value.as_str())
        .send()
        .await
        .map_err(ProbeError::Transport)?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(ProbeError::Status(status));
    }

    response
        .headers()
        .get(header::ETAG)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .ok_or(ProbeError::MissingEtag)
}
