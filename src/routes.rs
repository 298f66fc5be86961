//! Router assembly and route handlers.

use std::sync::Arc;

use axum::extract::{Extension, Query, State};
use axum::http::{StatusCode, header};
use axum::middleware;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::auth::gate::gate_middleware;
use crate::auth::resolver::{SessionUserResolver, Unauthorized};
use crate::auth::session::session_cookie;
use crate::endpoints;
use crate::server::AppState;

/// Build the application router. The gate middleware wraps every route;
/// `TraceLayer` sits outside it so denied requests still get request spans.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(health))
        .route(endpoints::AUTH_LOGIN, get(login))
        .route(endpoints::AUTH_LOGIN_STATUS, get(login_status))
        .route(endpoints::AUTH_CALLBACK, get(callback))
        .route(endpoints::USER, get(current_user))
        .route(endpoints::APP_EXISTS, get(app_exists))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            gate_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Start a login: redirect the browser to the provider authorization URL.
async fn login(State(state): State<Arc<AppState>>) -> Response {
    match state.strategy.initiate() {
        Ok(request) => {
            debug!("Redirecting to authorization endpoint");
            Redirect::temporary(&request.redirect_url).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to start login");
            auth_failed_response()
        }
    }
}

/// Report whether the caller holds a live session. Allowlisted, so it must
/// answer for logged-out callers too.
async fn login_status(Extension(resolver): Extension<SessionUserResolver>) -> impl IntoResponse {
    let authenticated = resolver
        .session()
        .is_some_and(|session| !session.token.is_expired());
    Json(json!({ "loggedIn": authenticated }))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Complete the authorization-code callback. The session is committed to
/// the store only after the whole exchange and introspection chain has
/// succeeded; every failure collapses to one generic 401.
async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = params.error {
        warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "Provider returned an authorization error"
        );
        return auth_failed_response();
    }

    let (Some(code), Some(auth_state)) = (params.code, params.state) else {
        warn!("Callback missing code or state");
        return auth_failed_response();
    };

    match state.strategy.complete_callback(&code, &auth_state).await {
        Ok(session) => {
            let id = state.sessions.insert(session);
            (
                StatusCode::OK,
                [(header::SET_COOKIE, session_cookie(&id))],
                Json(json!({"message": "Login successful"})),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "Callback failed");
            auth_failed_response()
        }
    }
}

/// The authenticated caller's user record.
async fn current_user(
    Extension(resolver): Extension<SessionUserResolver>,
) -> Result<impl IntoResponse, Unauthorized> {
    let user = resolver.resolve().await?;
    Ok(Json(json!({
        "uid": user.uid,
        "username": user.username,
    })))
}

/// Whether the console application is installed. Representative protected
/// endpoint; the real lookup lives behind the API server.
async fn app_exists(
    Extension(resolver): Extension<SessionUserResolver>,
) -> Result<impl IntoResponse, Unauthorized> {
    resolver.resolve().await?;
    Ok(Json(json!({ "exists": true })))
}

/// Generic authentication-failure body. Provider internals never leak to
/// the browser.
fn auth_failed_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Authentication failed"})),
    )
        .into_response()
}
