//! Console Gate Library
//!
//! Authentication gate for the web console backend: OAuth2
//! authorization-code flow with PKCE against the cluster identity provider.
//!
//! # Features
//!
//! - **Discovery**: RFC 8414 authorization-server metadata, fetched once and
//!   memoized for the process lifetime with single-flight fan-in
//! - **Login flow**: authorization-code exchange with PKCE (S256) and a CSRF
//!   `state` parameter, both always on
//! - **Sessions**: cookie-referenced in-memory sessions with locally
//!   estimated token lifetimes
//! - **Gate**: ordered per-request allow/deny middleware, 401s instead of
//!   redirects
//! - **Self-healing**: stale sessions whose backing user is gone are cleared
//!   on first use

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod apiserver;
pub mod auth;
pub mod cli;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod introspect;
pub mod routes;
pub mod server;
pub mod users;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
