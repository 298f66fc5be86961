//! HTTP server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::auth::gate::AuthGate;
use crate::auth::session::SessionStore;
use crate::auth::strategy::AuthStrategy;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::routes::create_router;
use crate::users::UserRegistry;

/// Shared application state handed to every handler and the gate middleware.
pub struct AppState {
    /// Live sessions
    pub sessions: Arc<SessionStore>,
    /// User persistence boundary
    pub users: Arc<dyn UserRegistry>,
    /// Login flow implementation
    pub strategy: Arc<dyn AuthStrategy>,
    /// Per-request authentication gate
    pub gate: AuthGate,
}

/// The console gate HTTP server.
pub struct Server {
    config: Config,
    state: Arc<AppState>,
}

impl Server {
    /// Create a server from configuration and assembled state.
    pub fn new(config: Config, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Bind and serve until ctrl-c.
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen address: {e}")))?;

        let router = create_router(self.state);
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %addr, "Console gate listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install ctrl-c handler");
        return;
    }
    info!("Shutdown signal received");
}
