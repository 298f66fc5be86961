//! API endpoint path constants.
//!
//! One source of truth for every route the backend serves, shared by the
//! router and the authentication allowlist.

/// Root prefix for all API routes. Paths outside this prefix are not
/// subject to authentication.
pub const API_ROOT: &str = "/api/v1";

/// Health probe endpoint.
pub const HEALTH: &str = "/api/v1/health";

/// Starts the OAuth login flow by redirecting to the provider.
pub const AUTH_LOGIN: &str = "/api/v1/auth/login";

/// Reports whether the caller currently holds a live session.
pub const AUTH_LOGIN_STATUS: &str = "/api/v1/auth/login/status";

/// OAuth authorization-code callback.
pub const AUTH_CALLBACK: &str = "/api/v1/auth/callback";

/// Current authenticated user.
pub const USER: &str = "/api/v1/user";

/// Whether the console application is installed for the cluster.
pub const APP_EXISTS: &str = "/api/v1/app/exists";

/// Cluster information.
pub const CLUSTER: &str = "/api/v1/cluster";
