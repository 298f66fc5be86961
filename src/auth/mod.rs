//! OAuth2 authentication: discovery, the authorization-code flow with PKCE,
//! session state, and the per-request gate.

pub mod callback;
pub mod discovery;
pub mod gate;
pub mod resolver;
pub mod session;
pub mod strategy;
