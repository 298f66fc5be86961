//! Authorization-code flow strategy with PKCE.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::RngExt;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::callback::CallbackHandler;
use crate::auth::discovery::DiscoveryCache;
use crate::auth::session::SessionData;
use crate::config::OAuthCredentials;
use crate::error::{Error, Result};

/// How long a pending authorization may wait for its callback.
const PENDING_TTL_SECS: i64 = 600;

/// Everything the code-flow strategy needs to run.
///
/// `state` and `pkce` are always true: CSRF protection and PKCE are not
/// optional against this provider.
#[derive(Debug, Clone)]
pub struct StrategyOptions {
    /// Provider authorization endpoint
    pub authorization_url: String,
    /// Provider token endpoint
    pub token_url: String,
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Absolute callback URL registered with the provider
    pub callback_url: String,
    /// Whether the CSRF `state` parameter is enforced (always true)
    pub state: bool,
    /// Whether PKCE is used (always true)
    pub pkce: bool,
}

/// Assemble strategy options from validated credentials and discovered
/// endpoints. Credential validation happens in `OAuthConfig::validated`
/// before any network call; this only adds the discovered endpoints.
pub async fn build_options(
    creds: &OAuthCredentials,
    discovery: &DiscoveryCache,
) -> Result<StrategyOptions> {
    let info = discovery.fetch().await?;

    info!(
        client_id = %creds.client_id,
        callback_url = %creds.callback_url,
        authorization_url = %info.authorization_endpoint,
        "OAuth strategy configured"
    );

    Ok(StrategyOptions {
        authorization_url: info.authorization_endpoint.clone(),
        token_url: info.token_endpoint.clone(),
        client_id: creds.client_id.clone(),
        client_secret: creds.client_secret.clone(),
        callback_url: creds.callback_url.clone(),
        state: true,
        pkce: true,
    })
}

/// A started login: where to send the browser, and the state tying the
/// eventual callback to it.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Full provider authorization URL to redirect to
    pub redirect_url: String,
    /// CSRF state carried through the round trip
    pub state: String,
}

/// The login flow seam. The production implementation is `CodeFlowStrategy`;
/// tests substitute fakes.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Begin a login: produce the provider redirect and record the pending
    /// authorization.
    fn initiate(&self) -> Result<AuthorizationRequest>;

    /// Complete a callback: validate `state`, exchange `code` for a token,
    /// and build the session payload.
    async fn complete_callback(&self, code: &str, state: &str) -> Result<SessionData>;
}

struct PendingAuthorization {
    code_verifier: String,
    created_at: DateTime<Utc>,
}

/// OAuth2 authorization-code flow with PKCE (S256).
pub struct CodeFlowStrategy {
    options: StrategyOptions,
    http: reqwest::Client,
    callback: CallbackHandler,
    pending: DashMap<String, PendingAuthorization>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl CodeFlowStrategy {
    /// Create a strategy from assembled options.
    pub fn new(options: StrategyOptions, http: reqwest::Client, callback: CallbackHandler) -> Self {
        Self {
            options,
            http,
            callback,
            pending: DashMap::new(),
        }
    }

    fn authorize_url(&self, state: &str, code_challenge: &str) -> Result<String> {
        let mut url = Url::parse(&self.options.authorization_url)
            .map_err(|e| Error::Internal(format!("invalid authorization URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.options.client_id)
            .append_pair("redirect_uri", &self.options.callback_url)
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<String> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.options.callback_url),
            ("client_id", &self.options.client_id),
            ("client_secret", &self.options.client_secret),
            ("code_verifier", code_verifier),
        ];

        let response = self
            .http
            .post(&self.options.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::TokenExchange(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::TokenExchange(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))?;

        // The provider issues neither refresh tokens nor profile data, so
        // the access token is all we take from the response.
        Ok(token.access_token)
    }
}

#[async_trait]
impl AuthStrategy for CodeFlowStrategy {
    fn initiate(&self) -> Result<AuthorizationRequest> {
        let state = generate_state();
        let (code_verifier, code_challenge) = generate_pkce();

        let redirect_url = self.authorize_url(&state, &code_challenge)?;
        // Abandoned logins never see a callback; sweep dead entries here so
        // the pending map stays bounded.
        let cutoff = Utc::now() - Duration::seconds(PENDING_TTL_SECS);
        self.pending.retain(|_, pending| pending.created_at > cutoff);
        self.pending.insert(
            state.clone(),
            PendingAuthorization {
                code_verifier,
                created_at: Utc::now(),
            },
        );

        debug!(state = %state, "Authorization started");
        Ok(AuthorizationRequest {
            redirect_url,
            state,
        })
    }

    async fn complete_callback(&self, code: &str, state: &str) -> Result<SessionData> {
        // Single use: remove the pending entry up front so a replayed state
        // fails even if the exchange below does not.
        let Some((_, pending)) = self.pending.remove(state) else {
            warn!("Callback with unknown or replayed state");
            return Err(Error::TokenExchange(
                "unknown or expired authorization state".to_string(),
            ));
        };

        if Utc::now() - pending.created_at > Duration::seconds(PENDING_TTL_SECS) {
            warn!("Callback for an expired pending authorization");
            return Err(Error::TokenExchange(
                "unknown or expired authorization state".to_string(),
            ));
        }

        let access_token = self.exchange_code(code, &pending.code_verifier).await?;
        self.callback.complete(access_token).await
    }
}

/// Generate a PKCE verifier and its S256 challenge.
fn generate_pkce() -> (String, String) {
    let verifier_bytes: [u8; 32] = rand::rng().random();
    let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
    (verifier, challenge)
}

/// Generate a random CSRF state value.
fn generate_state() -> String {
    let state_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(state_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generate_pkce_verifier_and_challenge() {
        let (verifier, challenge) = generate_pkce();
        assert_eq!(verifier.len(), 43); // 32 bytes, base64url, no padding
        assert_eq!(challenge.len(), 43); // sha256 digest, same encoding
        assert_ne!(verifier, challenge);

        let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        assert_eq!(challenge, expected);
    }

    #[test]
    fn test_generate_pkce_unique() {
        let (a, _) = generate_pkce();
        let (b, _) = generate_pkce();
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_state_unique_and_url_safe() {
        let a = generate_state();
        let b = generate_state();
        assert_ne!(a, b);
        assert!(!a.contains('+') && !a.contains('/') && !a.contains('='));
    }

    fn test_strategy() -> CodeFlowStrategy {
        CodeFlowStrategy::new(
            StrategyOptions {
                authorization_url: "https://oauth.example.com/authorize".to_string(),
                token_url: "https://oauth.example.com/token".to_string(),
                client_id: "console".to_string(),
                client_secret: "s3cret".to_string(),
                callback_url: "https://console.example.com/api/v1/auth/callback".to_string(),
                state: true,
                pkce: true,
            },
            reqwest::Client::new(),
            CallbackHandler::new(
                std::sync::Arc::new(PanicIntrospector),
                std::sync::Arc::new(crate::users::InMemoryUserRegistry::new()),
            ),
        )
    }

    #[test]
    fn test_authorize_url_carries_pkce_and_state() {
        let strategy = test_strategy();

        let request = strategy.initiate().unwrap();
        let url = Url::parse(&request.redirect_url).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "console");
        assert_eq!(pairs["state"], request.state.as_str());
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert!(pairs.contains_key("code_challenge"));
        // The secret never appears in a browser-visible URL.
        assert!(!pairs.contains_key("client_secret"));
    }

    #[tokio::test]
    async fn test_unknown_state_rejected() {
        let strategy = test_strategy();

        let err = strategy
            .complete_callback("code", "never-issued")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TokenExchange(_)));
    }

    #[test]
    fn test_initiate_sweeps_expired_pending_authorizations() {
        let strategy = test_strategy();
        strategy.pending.insert(
            "stale".to_string(),
            PendingAuthorization {
                code_verifier: "v".to_string(),
                created_at: Utc::now() - Duration::seconds(PENDING_TTL_SECS + 1),
            },
        );
        strategy.pending.insert(
            "fresh".to_string(),
            PendingAuthorization {
                code_verifier: "v".to_string(),
                created_at: Utc::now(),
            },
        );

        strategy.initiate().unwrap();

        assert!(!strategy.pending.contains_key("stale"));
        assert!(strategy.pending.contains_key("fresh"));
        assert_eq!(strategy.pending.len(), 2);
    }

    struct PanicIntrospector;

    #[async_trait]
    impl crate::introspect::TokenIntrospector for PanicIntrospector {
        async fn introspect_token(
            &self,
            _access_token: &str,
        ) -> Result<crate::introspect::TokenIntrospection> {
            panic!("introspection must not run in this test");
        }

        async fn introspect_user(
            &self,
            _access_token: &str,
        ) -> Result<crate::auth::session::UserInfo> {
            panic!("introspection must not run in this test");
        }
    }
}
