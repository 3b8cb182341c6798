//! Client configuration.
//!
//! Every field is optional in TOML and falls back to the production
//! defaults:
//!
//! ```toml
//! api-url = "https://api.userdeck.com"
//! authorize-url = "https://app.userdeck.com/oauth/authorize"
//! client-id = "my-client"
//! client-secret = "s3cret"
//! timeout = 30
//! session-prefix = "ud_"
//! follow-redirects = true
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://api.userdeck.com";

/// Default OAuth authorize endpoint.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://app.userdeck.com/oauth/authorize";

/// Default session key prefix.
pub const DEFAULT_SESSION_PREFIX: &str = "ud_";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClientConfig {
    pub api_url: String,
    pub authorize_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Request timeout in seconds.
    pub timeout: u64,
    pub session_prefix: String,
    pub follow_redirects: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            client_id: None,
            client_secret: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
            follow_redirects: true,
        }
    }
}

// Keep the secret out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("authorize_url", &self.authorize_url)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .field("session_prefix", &self.session_prefix)
            .field("follow_redirects", &self.follow_redirects)
            .finish()
    }
}

impl ClientConfig {
    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.authorize_url, DEFAULT_AUTHORIZE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.session_prefix, "ud_");
        assert!(config.follow_redirects);
        assert!(config.client_id.is_none());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ClientConfig::from_toml(
            r#"
            client-id = "abc"
            client-secret = "shh"
            timeout = 5
            follow-redirects = false
            "#,
        )
        .unwrap();

        assert_eq!(config.client_id.as_deref(), Some("abc"));
        assert_eq!(config.client_secret.as_deref(), Some("shh"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(!config.follow_redirects);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_from_toml_invalid() {
        let err = ClientConfig::from_toml("timeout = \"soon\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("userdeck.toml");
        std::fs::write(&path, "api-url = \"http://localhost:9000\"\n").unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.api_url, "http://localhost:9000");

        assert!(ClientConfig::load(&temp.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ClientConfig {
            client_secret: Some("hunter2".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
