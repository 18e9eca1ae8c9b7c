//! Upstream manifest fetching.
//!
//! [`ManifestFetcher`] is the seam between the interception layer and the
//! network. [`HttpFetcher`] is the reqwest-backed implementation used by the
//! server; tests substitute their own.
//!
//! Each call makes a single attempt. A failed Main fetch is recovered by the
//! player issuing a fresh request.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure of a single upstream fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The fetch task ended without a result, e.g. the fetcher panicked.
    #[error("fetch of {url} aborted: {reason}")]
    Aborted { url: String, reason: String },
}

/// Retrieves the raw bytes of the real manifest.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// HTTP GET via a shared reqwest [`Client`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    /// Per-request timeout; `None` leaves the client's own timeout in charge
    timeout: Option<Duration>,
}

impl HttpFetcher {
    pub fn new(client: Client, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ManifestFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|source| {
            warn!("Manifest fetch failed for {}: {}", url, source);
            FetchError::Http {
                url: url.to_string(),
                source,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Manifest fetch returned {} for {}", status, url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;
        debug!("Fetched {} bytes from {}", body.len(), url);

        Ok(body)
    }
}
