//! OAuth authorization server discovery (RFC 8414) with process-lifetime
//! memoization.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::apiserver::ApiServerClient;
use crate::error::{Error, Result};

/// Well-known path of the authorization server metadata document.
pub const OAUTH_SERVER_PATH: &str = ".well-known/oauth-authorization-server";

/// OAuth authorization server metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthServerInfo {
    /// Issuer identifier URL
    pub issuer: String,
    /// Authorization endpoint URL
    pub authorization_endpoint: String,
    /// Token endpoint URL
    pub token_endpoint: String,
    /// Supported scopes
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    /// Supported response types
    #[serde(default)]
    pub response_types_supported: Vec<String>,
    /// Supported grant types
    #[serde(default)]
    pub grant_types_supported: Vec<String>,
    /// Supported PKCE code challenge methods
    #[serde(default)]
    pub code_challenge_methods_supported: Vec<String>,
}

impl OAuthServerInfo {
    /// Whether the server advertises S256 PKCE support.
    pub fn supports_pkce(&self) -> bool {
        self.code_challenge_methods_supported
            .iter()
            .any(|method| method == "S256")
    }
}

// The shared future carries String, not Error: Error is not Clone and every
// concurrent waiter must receive the same failure.
type SharedFetch = Shared<BoxFuture<'static, std::result::Result<Arc<OAuthServerInfo>, String>>>;

#[derive(Default)]
struct CacheSlot {
    cached: Option<Arc<OAuthServerInfo>>,
    inflight: Option<SharedFetch>,
}

/// Single-flight cache over the authorization server metadata.
///
/// The document is immutable for the cluster's lifetime, so the first
/// successful fetch is memoized forever. Concurrent first callers share one
/// in-flight request and observe the same value or the same failure; a
/// failure is not memoized, so a later call retries.
pub struct DiscoveryCache {
    client: Arc<dyn ApiServerClient>,
    slot: Mutex<CacheSlot>,
}

impl DiscoveryCache {
    /// Create a cache over the given API server client.
    pub fn new(client: Arc<dyn ApiServerClient>) -> Self {
        Self {
            client,
            slot: Mutex::new(CacheSlot::default()),
        }
    }

    /// Return the authorization server metadata, fetching it at most once
    /// per cache lifetime on the success path.
    pub async fn fetch(&self) -> Result<Arc<OAuthServerInfo>> {
        let fetch = {
            let mut slot = self.slot.lock();
            if let Some(info) = &slot.cached {
                return Ok(Arc::clone(info));
            }
            match slot.inflight.clone() {
                Some(shared) => shared,
                None => {
                    debug!(path = OAUTH_SERVER_PATH, "Fetching OAuth server metadata");
                    let client = Arc::clone(&self.client);
                    let shared = async move {
                        let value = client.fetch_json(OAUTH_SERVER_PATH).await.map_err(|e| {
                            match e {
                                Error::Internal(msg) => msg,
                                other => other.to_string(),
                            }
                        })?;
                        let info: OAuthServerInfo = serde_json::from_value(value)
                            .map_err(|e| format!("invalid metadata document: {e}"))?;
                        Ok(Arc::new(info))
                    }
                    .boxed()
                    .shared();
                    slot.inflight = Some(shared.clone());
                    shared
                }
            }
        };

        let outcome = fetch.await;

        let mut slot = self.slot.lock();
        slot.inflight = None;
        match outcome {
            Ok(info) => {
                let cached = slot.cached.get_or_insert_with(|| Arc::clone(&info));
                let info = Arc::clone(cached);
                drop(slot);
                info!(issuer = %info.issuer, "OAuth server metadata cached");
                Ok(info)
            }
            Err(msg) => Err(Error::Discovery(msg)),
        }
    }
}
