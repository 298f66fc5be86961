//! Configuration management for the console gate.

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// OAuth client configuration
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// Cluster API server configuration
    #[serde(default)]
    pub api_server: ApiServerConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3003
}

/// OAuth client credentials.
///
/// All three values come from the deployment contract: the `OAUTH_CLIENT_ID`,
/// `OAUTH_CLIENT_SECRET` and `OAUTH_CALLBACK_URL` environment variables, or
/// the `oauth` section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// OAuth client id registered with the identity provider
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Absolute callback URL the provider redirects back to
    #[serde(default)]
    pub callback_url: Option<String>,
}

/// Validated OAuth credentials, guaranteed present.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Absolute callback URL
    pub callback_url: String,
}

impl OAuthConfig {
    /// Check that every credential is present, reporting all missing names
    /// at once. Runs before any network call so a bad deployment fails fast.
    pub fn validated(&self) -> Result<OAuthCredentials> {
        let mut missing = Vec::new();
        if self.client_id.as_deref().is_none_or(str::is_empty) {
            missing.push("OAUTH_CLIENT_ID");
        }
        if self.client_secret.as_deref().is_none_or(str::is_empty) {
            missing.push("OAUTH_CLIENT_SECRET");
        }
        if self.callback_url.as_deref().is_none_or(str::is_empty) {
            missing.push("OAUTH_CALLBACK_URL");
        }
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing OAuth settings: {}",
                missing.join(", ")
            )));
        }
        Ok(OAuthCredentials {
            client_id: self.client_id.clone().unwrap_or_default(),
            client_secret: self.client_secret.clone().unwrap_or_default(),
            callback_url: self.callback_url.clone().unwrap_or_default(),
        })
    }
}

/// Cluster API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiServerConfig {
    /// Base URL of the cluster API server
    #[serde(default = "default_api_server_url")]
    pub url: String,

    /// Timeout applied to every API server and introspection request
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Path used to introspect an access token
    #[serde(default = "default_token_introspection_path")]
    pub token_introspection_path: String,

    /// Path used to introspect the user behind an access token
    #[serde(default = "default_user_introspection_path")]
    pub user_introspection_path: String,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            url: default_api_server_url(),
            request_timeout: default_request_timeout(),
            token_introspection_path: default_token_introspection_path(),
            user_introspection_path: default_user_introspection_path(),
        }
    }
}

fn default_api_server_url() -> String {
    "https://kubernetes.default.svc".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_token_introspection_path() -> String {
    "apis/oauth.openshift.io/v1/tokenreviews".to_string()
}

fn default_user_introspection_path() -> String {
    "apis/user.openshift.io/v1/users/~".to_string()
}

impl Config {
    /// Load configuration from an optional YAML file and environment
    /// variables.
    ///
    /// Precedence, lowest to highest: defaults, YAML file, `CONSOLE_GATE_`
    /// prefixed variables (nested with `__`), then the bare `OAUTH_*`
    /// deployment-contract variables which map into the `oauth` section.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A local .env is a development convenience only.
        dotenvy::dotenv().ok();

        let mut figment = Figment::new();

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment
            .merge(Env::prefixed("CONSOLE_GATE_").split("__"))
            .merge(
                Env::raw()
                    .only(&["OAUTH_CLIENT_ID", "OAUTH_CLIENT_SECRET", "OAUTH_CALLBACK_URL"])
                    .map(|key| {
                        key.as_str()
                            .to_ascii_lowercase()
                            .replacen("oauth_", "oauth.", 1)
                            .into()
                    }),
            );

        figment
            .extract()
            .map_err(|e| Error::Config(format!("failed to load configuration: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3003);
        assert_eq!(config.api_server.url, "https://kubernetes.default.svc");
        assert_eq!(config.api_server.request_timeout, Duration::from_secs(10));
        assert!(config.oauth.client_id.is_none());
    }

    #[test]
    fn test_validated_reports_every_missing_credential() {
        let oauth = OAuthConfig::default();
        let err = oauth.validated().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("OAUTH_CLIENT_ID"));
        assert!(msg.contains("OAUTH_CLIENT_SECRET"));
        assert!(msg.contains("OAUTH_CALLBACK_URL"));
    }

    #[test]
    fn test_validated_reports_only_missing_credentials() {
        let oauth = OAuthConfig {
            client_id: Some("console".to_string()),
            client_secret: None,
            callback_url: Some("https://console.example.com/api/v1/auth/callback".to_string()),
        };
        let msg = oauth.validated().unwrap_err().to_string();
        assert!(!msg.contains("OAUTH_CLIENT_ID,"));
        assert!(msg.contains("OAUTH_CLIENT_SECRET"));
        assert!(!msg.contains("OAUTH_CALLBACK_URL"));
    }

    #[test]
    fn test_validated_rejects_empty_strings() {
        let oauth = OAuthConfig {
            client_id: Some(String::new()),
            client_secret: Some("s3cret".to_string()),
            callback_url: Some("https://console.example.com/cb".to_string()),
        };
        let msg = oauth.validated().unwrap_err().to_string();
        assert!(msg.contains("OAUTH_CLIENT_ID"));
    }

    #[test]
    fn test_validated_succeeds_with_all_credentials() {
        let oauth = OAuthConfig {
            client_id: Some("console".to_string()),
            client_secret: Some("s3cret".to_string()),
            callback_url: Some("https://console.example.com/cb".to_string()),
        };
        let creds = oauth.validated().unwrap();
        assert_eq!(creds.client_id, "console");
        assert_eq!(creds.client_secret, "s3cret");
        assert_eq!(creds.callback_url, "https://console.example.com/cb");
    }

    #[test]
    fn test_load_missing_named_file_fails() {
        let err = Config::load(Some(Path::new("/nonexistent/config.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = r"
server:
  host: 0.0.0.0
  port: 8443
oauth:
  client_id: console
api_server:
  request_timeout: 5s
";
        let config: Config = figment::Figment::new()
            .merge(figment::providers::Yaml::string(yaml))
            .extract()
            .unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8443);
        assert_eq!(config.oauth.client_id.as_deref(), Some("console"));
        assert_eq!(config.api_server.request_timeout, Duration::from_secs(5));
    }
}
