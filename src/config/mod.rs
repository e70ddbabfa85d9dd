//! config
//!
//! Registry client configuration and loading.
//!
//! # Locations
//!
//! Searched in order; the first existing file wins:
//! 1. `$PROTOREG_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/protoreg/config.toml`
//! 3. `~/.protoreg/config.toml`
//!
//! Missing files are not an error (defaults are used). Files that exist but
//! do not parse or validate are.
//!
//! # Example
//!
//! ```no_run
//! use protoreg::registry::ClientBuilder;
//!
//! let config = protoreg::config::load().unwrap();
//! let client = ClientBuilder::from_config(&config).build().unwrap();
//! ```

pub mod schema;

pub use schema::{CacheConfig, ClientConfig, Credentials};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PROTOREG_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("invalid registry url '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Load configuration from the default locations.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be read, parsed or
/// validated.
pub fn load() -> Result<ClientConfig, ConfigError> {
    match find_config_file() {
        Some(path) => load_from(&path),
        None => Ok(ClientConfig::default()),
    }
}

/// Load and validate configuration from an explicit file.
pub fn load_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    debug!(path = %path.display(), "loading registry config");

    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: ClientConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    config.validate()?;
    Ok(config)
}

/// Find the first existing config file in the default locations.
pub fn find_config_file() -> Option<PathBuf> {
    // 1. Check $PROTOREG_CONFIG
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Check $XDG_CONFIG_HOME/protoreg/config.toml
    if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_home).join("protoreg/config.toml");
        if path.exists() {
            return Some(path);
        }
    }

    // 3. Check ~/.protoreg/config.toml
    dirs::home_dir()
        .map(|home| home.join(".protoreg/config.toml"))
        .filter(|path| path.exists())
}
