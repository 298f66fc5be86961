//! Console Gate - authentication gate for the web console backend.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use console_gate::{
    apiserver::HttpApiServerClient,
    auth::callback::CallbackHandler,
    auth::discovery::DiscoveryCache,
    auth::gate::{AllowList, AuthGate},
    auth::session::SessionStore,
    auth::strategy::{AuthStrategy, CodeFlowStrategy, build_options},
    cli::Cli,
    config::Config,
    introspect::{HttpIntrospector, TokenIntrospector},
    server::{AppState, Server},
    setup_tracing,
    users::{InMemoryUserRegistry, UserRegistry},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    run_server(cli).await
}

/// Run the console gate server
async fn run_server(cli: Cli) -> ExitCode {
    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            // Apply CLI overrides
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host = host.clone();
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Credentials are checked before anything touches the network.
    let creds = match config.oauth.validated() {
        Ok(creds) => creds,
        Err(e) => {
            error!("Invalid OAuth configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        api_server = %config.api_server.url,
        "Starting console gate"
    );

    let state = match build_state(&config, &creds).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to bootstrap: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Run with graceful shutdown
    if let Err(e) = Server::new(config, state).run().await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Console gate shutdown complete");
    ExitCode::SUCCESS
}

/// Discover the provider and assemble the shared application state.
async fn build_state(
    config: &Config,
    creds: &console_gate::config::OAuthCredentials,
) -> console_gate::Result<Arc<AppState>> {
    let api_client = Arc::new(HttpApiServerClient::new(
        &config.api_server.url,
        config.api_server.request_timeout,
    )?);
    let discovery = DiscoveryCache::new(api_client);
    let options = build_options(creds, &discovery).await?;

    let introspector: Arc<dyn TokenIntrospector> = Arc::new(HttpIntrospector::new(
        &config.api_server.url,
        &config.api_server.token_introspection_path,
        &config.api_server.user_introspection_path,
        config.api_server.request_timeout,
    )?);
    let users: Arc<dyn UserRegistry> = Arc::new(InMemoryUserRegistry::new());

    let http = reqwest::Client::builder()
        .timeout(config.api_server.request_timeout)
        .build()?;
    let callback = CallbackHandler::new(introspector, Arc::clone(&users));
    let strategy: Arc<dyn AuthStrategy> =
        Arc::new(CodeFlowStrategy::new(options, http, callback));

    Ok(Arc::new(AppState {
        sessions: Arc::new(SessionStore::new()),
        users,
        strategy,
        gate: AuthGate::new(AllowList::standard()),
    }))
}
