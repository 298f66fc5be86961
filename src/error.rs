//! Error types for the console gate.

use thiserror::Error;

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the console gate
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// OAuth server discovery errors
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Authorization-code exchange errors
    #[error("Token exchange error: {0}")]
    TokenExchange(String),

    /// Token or user introspection errors
    #[error("Introspection error: {0}")]
    Introspection(String),

    /// User registry errors
    #[error("User store error: {0}")]
    UserStore(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("missing OAUTH_CLIENT_ID".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: missing OAUTH_CLIENT_ID"
        );

        let err = Error::Discovery("well-known endpoint unreachable".to_string());
        assert_eq!(
            err.to_string(),
            "Discovery error: well-known endpoint unreachable"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{broken").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
