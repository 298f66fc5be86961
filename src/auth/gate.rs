//! Per-request authentication gate.
//!
//! Every request passes an ordered list of gate functions; the first one to
//! return a verdict wins. Denials are plain 401 responses, never redirects:
//! the frontend owns navigation.

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, trace};

use crate::auth::resolver::SessionUserResolver;
use crate::auth::session::{SessionData, session_id_from_headers};
use crate::endpoints;
use crate::server::AppState;

/// Paths reachable without a session.
#[derive(Debug, Clone)]
pub struct AllowList(Vec<&'static str>);

impl AllowList {
    /// The standard allowlist: the login flow itself must be reachable
    /// while logged out.
    pub fn standard() -> Self {
        Self(vec![
            endpoints::AUTH_LOGIN,
            endpoints::AUTH_LOGIN_STATUS,
            endpoints::AUTH_CALLBACK,
        ])
    }

    /// Membership check: exact match, or match with a single trailing slash
    /// stripped. `/auth/callback/` is allowlisted, `/auth/callback//` is not.
    pub fn contains(&self, path: &str) -> bool {
        let normalized = path.strip_suffix('/').unwrap_or(path);
        self.0.iter().any(|entry| *entry == normalized)
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No session accompanies the request
    NoSession,
    /// The session's token lifetime estimate has run out
    TokenExpired,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSession => write!(f, "there is no user session"),
            Self::TokenExpired => write!(f, "user token appears to be expired"),
        }
    }
}

/// Verdict of a single gate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Admit the request
    Allow,
    /// Reject the request with 401
    Deny(DenyReason),
    /// No opinion, ask the next gate
    Continue,
}

/// The ordered authentication gate.
#[derive(Debug, Clone)]
pub struct AuthGate {
    allowlist: AllowList,
}

impl AuthGate {
    /// Create a gate with the given allowlist.
    pub fn new(allowlist: AllowList) -> Self {
        Self { allowlist }
    }

    fn jurisdiction(path: &str) -> GateDecision {
        if path.starts_with(endpoints::API_ROOT) {
            GateDecision::Continue
        } else {
            GateDecision::Allow
        }
    }

    fn allowlisted(&self, path: &str) -> GateDecision {
        if self.allowlist.contains(path) {
            GateDecision::Allow
        } else {
            GateDecision::Continue
        }
    }

    fn session_present(session: Option<&SessionData>) -> GateDecision {
        if session.is_some() {
            GateDecision::Continue
        } else {
            GateDecision::Deny(DenyReason::NoSession)
        }
    }

    fn token_unexpired(session: Option<&SessionData>, now: DateTime<Utc>) -> GateDecision {
        match session {
            Some(session) if session.token.is_expired_at(now) => {
                GateDecision::Deny(DenyReason::TokenExpired)
            }
            _ => GateDecision::Continue,
        }
    }

    /// Run the gates in order and return the first verdict. If every gate
    /// passes, the request is allowed.
    pub fn evaluate(
        &self,
        path: &str,
        session: Option<&SessionData>,
        now: DateTime<Utc>,
    ) -> GateDecision {
        let decisions = [
            Self::jurisdiction(path),
            self.allowlisted(path),
            Self::session_present(session),
            Self::token_unexpired(session, now),
        ];
        for decision in decisions {
            if decision != GateDecision::Continue {
                return decision;
            }
        }
        GateDecision::Allow
    }
}

/// Axum middleware applying the gate to every request.
///
/// Runs before any protected handler (guaranteed by router layer ordering).
/// Allowed requests get a `SessionUserResolver` extension so handlers can
/// resolve their user lazily.
pub async fn gate_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let session_id = session_id_from_headers(request.headers());
    let session = session_id.as_deref().and_then(|id| state.sessions.get(id));

    match state.gate.evaluate(&path, session.as_ref(), Utc::now()) {
        GateDecision::Deny(reason) => {
            // An expired session can never be admitted again; evict it so
            // the store stays bounded.
            if reason == DenyReason::TokenExpired {
                if let Some(id) = session_id.as_deref() {
                    state.sessions.clear(id);
                }
            }
            debug!(path = %path, reason = %reason, "Blocking request");
            unauthorized_response()
        }
        _ => {
            trace!(path = %path, "Request admitted");
            request.extensions_mut().insert(SessionUserResolver::new(
                session_id,
                Arc::clone(&state.sessions),
                Arc::clone(&state.users),
            ));
            next.run(request).await
        }
    }
}

/// The uniform 401 response body.
pub(crate) fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Authentication required"})),
    )
        .into_response()
}
