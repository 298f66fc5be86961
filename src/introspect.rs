//! Token and user introspection against the cluster API server.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::auth::session::UserInfo;
use crate::error::{Error, Result};

/// Result of introspecting an access token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenIntrospection {
    /// Remaining token lifetime in seconds
    pub expires_in: u64,
    /// Scopes granted to the token
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Boundary to the provider's introspection endpoints.
#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    /// Introspect an access token, returning its remaining lifetime.
    async fn introspect_token(&self, access_token: &str) -> Result<TokenIntrospection>;

    /// Introspect the user the access token belongs to.
    async fn introspect_user(&self, access_token: &str) -> Result<UserInfo>;
}

/// `TokenIntrospector` backed by reqwest, authenticating each call with the
/// token under introspection.
#[derive(Debug, Clone)]
pub struct HttpIntrospector {
    client: reqwest::Client,
    token_url: String,
    user_url: String,
}

impl HttpIntrospector {
    /// Create an introspector against the given API server base URL.
    pub fn new(
        base_url: &str,
        token_path: &str,
        user_path: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            token_url: format!("{base}/{}", token_path.trim_start_matches('/')),
            user_url: format!("{base}/{}", user_path.trim_start_matches('/')),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, access_token: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::Introspection(format!("GET {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Introspection(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Introspection(format!("invalid JSON from {url}: {e}")))
    }
}

#[async_trait]
impl TokenIntrospector for HttpIntrospector {
    async fn introspect_token(&self, access_token: &str) -> Result<TokenIntrospection> {
        self.get_json(&self.token_url, access_token).await
    }

    async fn introspect_user(&self, access_token: &str) -> Result<UserInfo> {
        self.get_json(&self.user_url, access_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_introspect_token_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "expires_in": 3600,
                "scopes": ["user:full"]
            })))
            .mount(&server)
            .await;

        let introspector =
            HttpIntrospector::new(&server.uri(), "token", "user", Duration::from_secs(2)).unwrap();
        let result = introspector.introspect_token("tok-1").await.unwrap();
        assert_eq!(result.expires_in, 3600);
        assert_eq!(result.scopes, vec!["user:full"]);
    }

    #[tokio::test]
    async fn test_introspect_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "uid": "u-1",
                "username": "developer"
            })))
            .mount(&server)
            .await;

        let introspector =
            HttpIntrospector::new(&server.uri(), "token", "user", Duration::from_secs(2)).unwrap();
        let info = introspector.introspect_user("tok-1").await.unwrap();
        assert_eq!(info.uid, "u-1");
        assert_eq!(info.username, "developer");
    }

    #[tokio::test]
    async fn test_introspection_failure_surfaces_as_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let introspector =
            HttpIntrospector::new(&server.uri(), "token", "user", Duration::from_secs(2)).unwrap();
        let err = introspector.introspect_token("bad").await.unwrap_err();
        assert!(matches!(err, Error::Introspection(_)));
    }
}
