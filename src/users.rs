//! User records and the registry collaborator.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::auth::session::{SessionData, UserInfo};
use crate::error::Result;

/// A persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable unique id (matches the provider uid)
    pub uid: String,
    /// Login name
    pub username: String,
}

/// Boundary to user persistence.
///
/// The gate needs two operations: an idempotent upsert at login time and a
/// lookup when a request resolves its user. Storage internals stay behind
/// this trait.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    /// Upsert the user backing a freshly authenticated session. Repeated
    /// logins for the same uid must converge on one record.
    async fn load_or_create(&self, session: &SessionData) -> Result<User>;

    /// Look up the user backing a session. `Ok(None)` means the record is
    /// definitively absent, as opposed to a store failure.
    async fn load(&self, info: &UserInfo) -> Result<Option<User>>;
}

/// In-memory `UserRegistry` keyed by uid.
#[derive(Debug, Default)]
pub struct InMemoryUserRegistry {
    users: DashMap<String, User>,
}

impl InMemoryUserRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRegistry for InMemoryUserRegistry {
    async fn load_or_create(&self, session: &SessionData) -> Result<User> {
        let info = &session.info;
        let user = self
            .users
            .entry(info.uid.clone())
            .or_insert_with(|| User {
                uid: info.uid.clone(),
                username: info.username.clone(),
            })
            .clone();
        Ok(user)
    }

    async fn load(&self, info: &UserInfo) -> Result<Option<User>> {
        Ok(self.users.get(&info.uid).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::TokenInfo;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    fn session_for(uid: &str, username: &str) -> SessionData {
        let now = Utc::now();
        SessionData {
            token: TokenInfo {
                access_token: "tok".to_string(),
                created_at_estimate: now,
                expires_at_estimate: now + Duration::seconds(300),
            },
            info: UserInfo {
                uid: uid.to_string(),
                username: username.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_load_or_create_is_idempotent() {
        let registry = InMemoryUserRegistry::new();
        let first = registry
            .load_or_create(&session_for("u-1", "developer"))
            .await
            .unwrap();
        let second = registry
            .load_or_create(&session_for("u-1", "developer"))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.users.len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_user_is_none() {
        let registry = InMemoryUserRegistry::new();
        let info = UserInfo {
            uid: "ghost".to_string(),
            username: "ghost".to_string(),
        };
        assert!(registry.load(&info).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_after_create() {
        let registry = InMemoryUserRegistry::new();
        let session = session_for("u-2", "admin");
        registry.load_or_create(&session).await.unwrap();
        let user = registry.load(&session.info).await.unwrap().unwrap();
        assert_eq!(user.username, "admin");
    }
}
