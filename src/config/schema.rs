//! config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! url = "https://registry.example.com"
//! insecure = false
//!
//! [credentials]
//! username = "svc-orders"
//! password = "secret"
//!
//! [cache]
//! enabled = true
//! ttl_secs = 300
//! schema_value_caching = true
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing; the url must parse and name a host.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::registry::DEFAULT_URL;

/// Registry client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Registry base URL
    pub url: Option<String>,

    /// Skip TLS certificate verification
    pub insecure: Option<bool>,

    /// Basic-auth credentials
    pub credentials: Option<Credentials>,

    /// Caching settings
    pub cache: Option<CacheConfig>,
}

impl ClientConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the url does not parse or has
    /// no host.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url(self.url())?;
        Ok(())
    }

    /// Registry base URL.
    ///
    /// Defaults to `http://localhost:8081` if not configured.
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_URL)
    }

    /// Check if TLS verification is disabled.
    ///
    /// Defaults to `false` if not configured.
    pub fn insecure(&self) -> bool {
        self.insecure.unwrap_or(false)
    }

    /// Check if the caching decorator is enabled.
    ///
    /// Defaults to `false` if not configured.
    pub fn caching(&self) -> bool {
        self.cache
            .as_ref()
            .and_then(|c| c.enabled)
            .unwrap_or(false)
    }

    /// Lifetime of volatile cache entries.
    ///
    /// `None` (the default) keeps them until invalidated.
    pub fn cache_ttl(&self) -> Option<std::time::Duration> {
        self.cache
            .as_ref()
            .and_then(|c| c.ttl_secs)
            .map(std::time::Duration::from_secs)
    }

    /// Check if created schemas are cached by content hash.
    ///
    /// Defaults to `false` if not configured.
    pub fn schema_value_caching(&self) -> bool {
        self.cache
            .as_ref()
            .and_then(|c| c.schema_value_caching)
            .unwrap_or(false)
    }
}

/// Parse and check a registry URL.
pub(crate) fn validate_url(url: &str) -> Result<reqwest::Url, ConfigError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl {
            url: url.to_string(),
            message: "missing hostname".to_string(),
        });
    }

    Ok(parsed)
}

/// Basic-auth credentials.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// Password
    pub password: String,
}

// Custom Debug to avoid exposing the password
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Create credentials from a user name and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse credentials in `user:pass` form.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` unless the input contains exactly
    /// one `:` separator.
    ///
    /// # Example
    ///
    /// ```
    /// use protoreg::config::Credentials;
    ///
    /// let creds = Credentials::parse("alice:secret").unwrap();
    /// assert_eq!(creds.username, "alice");
    /// assert!(Credentials::parse("alice").is_err());
    /// ```
    pub fn parse(pair: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = pair.split(':').collect();
        match parts.as_slice() {
            [username, password] => Ok(Self::new(*username, *password)),
            _ => Err(ConfigError::InvalidValue(
                "invalid credentials format, must be 'user:pass'".to_string(),
            )),
        }
    }
}

/// Caching settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Wrap the client with the caching decorator
    pub enabled: Option<bool>,

    /// Lifetime of volatile entries in seconds
    pub ttl_secs: Option<u64>,

    /// Cache created schemas by content hash
    pub schema_value_caching: Option<bool>,
}
