//! registry::factory
//!
//! Client construction from explicit options or loaded configuration.
//!
//! # Design
//!
//! Callers build clients through [`ClientBuilder`] instead of assembling the
//! HTTP client and caching decorator by hand. The builder covers the full
//! option set:
//! - base URL (default `http://localhost:8081`)
//! - TLS-insecure flag
//! - basic-auth credentials
//! - custom HTTP client (takes precedence over the insecure flag)
//! - caching on/off, volatile-tier TTL, schema-value caching on/off
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use protoreg::registry::ClientBuilder;
//!
//! let client = ClientBuilder::new()
//!     .url("http://registry:8081")
//!     .caching(true)
//!     .cache_ttl(Duration::from_secs(60))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(client.name(), "caching");
//! ```

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::warn;

use super::caching::{CacheOptions, CachingRegistryClient};
use super::http::{HttpRegistryClient, DEFAULT_URL};
use super::traits::RegistryClient;
use crate::config::schema::validate_url;
use crate::config::{ClientConfig, ConfigError, Credentials};

/// Builder for registry clients.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    url: String,
    insecure: bool,
    credentials: Option<Credentials>,
    http_client: Option<Client>,
    caching: bool,
    cache_options: CacheOptions,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Start from defaults: local registry, no auth, no caching.
    pub fn new() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            insecure: false,
            credentials: None,
            http_client: None,
            caching: false,
            cache_options: CacheOptions::default(),
        }
    }

    /// Start from a loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            url: config.url().to_string(),
            insecure: config.insecure(),
            credentials: config.credentials.clone(),
            http_client: None,
            caching: config.caching(),
            cache_options: CacheOptions {
                ttl: config.cache_ttl(),
                schema_value_caching: config.schema_value_caching(),
            },
        }
    }

    /// Set the registry base URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Skip TLS certificate verification.
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Authenticate with basic auth.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Use a preconfigured HTTP client for all requests.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Wrap the client with the caching decorator.
    pub fn caching(mut self, enabled: bool) -> Self {
        self.caching = enabled;
        self
    }

    /// Expire volatile cache entries `ttl` after they are written.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_options.ttl = Some(ttl);
        self
    }

    /// Short-circuit repeated creation of identical schema content.
    pub fn schema_value_caching(mut self, enabled: bool) -> Self {
        self.cache_options.schema_value_caching = enabled;
        self
    }

    /// Build the direct HTTP client, ignoring the caching options.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidUrl` if the url does not parse or has no host
    /// - `ConfigError::InvalidValue` if the HTTP client cannot be constructed
    pub fn build_http(&self) -> Result<HttpRegistryClient, ConfigError> {
        let base_url = validate_url(&self.url)?;

        let client = match &self.http_client {
            Some(client) => {
                if self.insecure {
                    warn!("custom HTTP client supplied; ignoring the insecure flag");
                }
                client.clone()
            }
            None => Client::builder()
                .danger_accept_invalid_certs(self.insecure)
                .build()
                .map_err(|e| ConfigError::InvalidValue(format!("failed to build HTTP client: {}", e)))?,
        };

        Ok(HttpRegistryClient::from_parts(
            client,
            base_url,
            self.credentials.clone(),
        ))
    }

    /// Build the configured client.
    ///
    /// Returns the direct client, or the direct client wrapped by the caching
    /// decorator when caching is enabled.
    pub fn build(&self) -> Result<Arc<dyn RegistryClient>, ConfigError> {
        let http = self.build_http()?;

        if self.caching {
            Ok(Arc::new(CachingRegistryClient::with_options(
                http,
                self.cache_options,
            )))
        } else {
            Ok(Arc::new(http))
        }
    }
}

/// Create a client from loaded configuration.
pub fn create_client(config: &ClientConfig) -> Result<Arc<dyn RegistryClient>, ConfigError> {
    ClientBuilder::from_config(config).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    #[test]
    fn default_builds_direct_client() {
        let client = ClientBuilder::new().build().unwrap();
        assert_eq!(client.name(), "http");
    }

    #[test]
    fn caching_wraps_client() {
        let client = ClientBuilder::new().caching(true).build().unwrap();
        assert_eq!(client.name(), "caching");
    }

    #[test]
    fn build_http_uses_url() {
        let http = ClientBuilder::new()
            .url("https://registry.example.com/base")
            .build_http()
            .unwrap();
        assert_eq!(http.base_url().as_str(), "https://registry.example.com/base");
    }

    #[test]
    fn invalid_url_is_rejected() {
        let result = ClientBuilder::new().url("registry:8081").build();
        assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn insecure_builds() {
        assert!(ClientBuilder::new().insecure(true).build_http().is_ok());
    }

    #[test]
    fn custom_http_client_is_accepted() {
        let client = ClientBuilder::new()
            .http_client(Client::new())
            .insecure(true)
            .build()
            .unwrap();
        assert_eq!(client.name(), "http");
    }

    #[test]
    fn from_config_copies_options() {
        let config = ClientConfig {
            url: Some("http://registry:8081".into()),
            insecure: Some(true),
            credentials: Some(Credentials::new("u", "p")),
            cache: Some(CacheConfig {
                enabled: Some(true),
                ttl_secs: Some(5),
                schema_value_caching: Some(true),
            }),
        };

        let builder = ClientBuilder::from_config(&config);
        assert_eq!(builder.url, "http://registry:8081");
        assert!(builder.insecure);
        assert_eq!(builder.credentials, Some(Credentials::new("u", "p")));
        assert!(builder.caching);
        assert_eq!(
            builder.cache_options,
            CacheOptions {
                ttl: Some(Duration::from_secs(5)),
                schema_value_caching: true,
            }
        );

        assert_eq!(create_client(&config).unwrap().name(), "caching");
    }
}
