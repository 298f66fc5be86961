//! Callback completion: turn an exchanged access token into session state.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};

use crate::auth::session::{SessionData, TokenInfo};
use crate::error::{Error, Result};
use crate::introspect::TokenIntrospector;
use crate::users::UserRegistry;

/// Completes an authorization-code callback once the token exchange has
/// produced an access token.
pub struct CallbackHandler {
    introspector: Arc<dyn TokenIntrospector>,
    users: Arc<dyn UserRegistry>,
}

impl CallbackHandler {
    /// Create a handler over the introspection and user-registry boundaries.
    pub fn new(introspector: Arc<dyn TokenIntrospector>, users: Arc<dyn UserRegistry>) -> Self {
        Self {
            introspector,
            users,
        }
    }

    /// Introspect the token and its user concurrently, build the session
    /// payload, and upsert the user record.
    ///
    /// The session is returned, not stored: the caller commits it only when
    /// this whole chain has succeeded, so a partially authenticated session
    /// is never observable.
    pub async fn complete(&self, access_token: String) -> Result<SessionData> {
        // The provider reports remaining lifetime, not an issue timestamp;
        // anchor the estimate to the moment the token arrived here.
        let created_at_estimate = Utc::now();

        let (token_result, user_info) = tokio::try_join!(
            self.introspector.introspect_token(&access_token),
            self.introspector.introspect_user(&access_token),
        )?;

        debug!(
            uid = %user_info.uid,
            expires_in = token_result.expires_in,
            "Token and user introspection complete"
        );

        // expires_in comes from an external collaborator; an absurd value
        // must surface as an error, never overflow the timestamp math.
        let expires_at_estimate = i64::try_from(token_result.expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| created_at_estimate.checked_add_signed(lifetime))
            .ok_or_else(|| Error::Introspection("expires_in out of range".to_string()))?;
        let session = SessionData {
            token: TokenInfo {
                access_token,
                created_at_estimate,
                expires_at_estimate,
            },
            info: user_info,
        };

        let user = self.users.load_or_create(&session).await?;
        info!(uid = %user.uid, username = %user.username, "User authenticated");

        Ok(session)
    }
}
