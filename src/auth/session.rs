//! Session state: token estimates, user identity, and the session store.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the cookie carrying the opaque session id.
pub const SESSION_COOKIE: &str = "console_session";

/// Access token plus locally estimated lifetime.
///
/// The identity provider returns no issue timestamp, so both timestamps are
/// estimates anchored to the moment the token landed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The bearer access token
    pub access_token: String,
    /// When this process received the token
    pub created_at_estimate: DateTime<Utc>,
    /// Estimated expiry: `created_at_estimate + expires_in`
    pub expires_at_estimate: DateTime<Utc>,
}

impl TokenInfo {
    /// Whether the token is expired at `now`. The boundary is inclusive: a
    /// token whose estimate equals `now` is already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_estimate <= now
    }

    /// Whether the token is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Identity attributes captured from user introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Stable unique id of the user at the provider
    pub uid: String,
    /// Human-readable login name
    pub username: String,
}

/// Everything a session holds: the token and the user behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Access token with lifetime estimates
    pub token: TokenInfo,
    /// Introspected user identity
    pub info: UserInfo,
}

/// In-memory session store keyed by opaque session ids.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionData>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session and return its freshly minted id.
    pub fn insert(&self, data: SessionData) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.insert(id.clone(), data);
        id
    }

    /// Look up a session by id.
    pub fn get(&self, id: &str) -> Option<SessionData> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Remove a session. The removal is durable: a subsequent `get` for the
    /// same id observes nothing.
    pub fn clear(&self, id: &str) {
        self.sessions.remove(id);
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Extract the session id from the request's Cookie header, if present.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            if name == SESSION_COOKIE {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Render the Set-Cookie value for a session id. The callback URL in the
/// deployment contract is HTTPS, so the cookie is marked Secure.
pub fn session_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; Secure; SameSite=Lax")
}
