//! HTTP client boundary to the cluster API server.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};

/// Boundary to the cluster API server.
///
/// The gate only ever reads well-known JSON documents from it, so the seam
/// is a single method; tests substitute an in-memory implementation.
#[async_trait]
pub trait ApiServerClient: Send + Sync {
    /// Fetch a JSON document at `path` relative to the API server base URL.
    async fn fetch_json(&self, path: &str) -> Result<Value>;
}

/// `ApiServerClient` backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpApiServerClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApiServerClient {
    /// Create a client for the given base URL with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ApiServerClient for HttpApiServerClient {
    async fn fetch_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("GET {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("invalid JSON from {url}: {e}")))
    }
}
