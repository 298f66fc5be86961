//! Lazy, fail-closed user resolution for admitted requests.

use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use crate::auth::gate::unauthorized_response;
use crate::auth::session::{SessionData, SessionStore};
use crate::users::{User, UserRegistry};

/// Typed rejection: the request cannot prove who it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        unauthorized_response()
    }
}

/// Attached by the gate middleware to every admitted request.
///
/// Handlers that need their user call `resolve`; handlers that do not never
/// pay for a registry lookup.
#[derive(Clone)]
pub struct SessionUserResolver {
    session_id: Option<String>,
    sessions: Arc<SessionStore>,
    users: Arc<dyn UserRegistry>,
}

impl SessionUserResolver {
    /// Create a resolver for the given request's session id.
    pub fn new(
        session_id: Option<String>,
        sessions: Arc<SessionStore>,
        users: Arc<dyn UserRegistry>,
    ) -> Self {
        Self {
            session_id,
            sessions,
            users,
        }
    }

    /// The session accompanying the request, if any.
    pub fn session(&self) -> Option<SessionData> {
        self.session_id
            .as_deref()
            .and_then(|id| self.sessions.get(id))
    }

    /// Fail-closed resolution: the user record must exist.
    ///
    /// A session whose backing user has disappeared is stale; it is cleared
    /// durably so the next request starts from a clean logged-out state.
    /// A registry failure also denies, but leaves the session alone: a
    /// store blip must not log users out.
    pub async fn resolve(&self) -> Result<User, Unauthorized> {
        let Some(id) = self.session_id.as_deref() else {
            return Err(Unauthorized);
        };
        let Some(session) = self.sessions.get(id) else {
            return Err(Unauthorized);
        };

        match self.users.load(&session.info).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                info!(uid = %session.info.uid, "Session has no backing user, clearing it");
                self.sessions.clear(id);
                Err(Unauthorized)
            }
            Err(e) => {
                warn!(uid = %session.info.uid, error = %e, "User lookup failed");
                Err(Unauthorized)
            }
        }
    }

    /// Silent resolution: absence is an ordinary `None`, with no denial.
    /// Still self-heals a stale session.
    pub async fn resolve_optional(&self) -> Option<User> {
        self.resolve().await.ok()
    }
}
