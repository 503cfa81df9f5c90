//! Backend Configuration
//!
//! Resolution of the generation backend's base URL. Precedence:
//!
//! 1. `EDUFLOW_BACKEND_URL` (or legacy `BACKEND_API_URL`) environment variable
//! 2. `$XDG_CONFIG_HOME/eduflow/config.toml`, section `[backend]`
//! 3. The loopback default
//!
//! A missing config file is not an error; a malformed one is. The default
//! uses `127.0.0.1` rather than `localhost` so resolution never lands on an
//! IPv6 loopback the backend is not listening on.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default backend address when nothing is configured
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Error loading backend settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file exists but could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Config file is not valid TOML
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Resolved connection settings for the generation backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendSettings {
    /// Backend base URL, no trailing slash
    pub base_url: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// On-disk config file shape
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    backend: BackendSection,
}

#[derive(Debug, Default, Deserialize)]
struct BackendSection {
    #[serde(default)]
    base_url: Option<String>,
}

impl BackendSettings {
    /// Create settings for an explicit base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize(base_url.into()),
        }
    }

    /// Create settings from environment variables, falling back to default
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("EDUFLOW_BACKEND_URL")
            .or_else(|_| std::env::var("BACKEND_API_URL"))
            .map_or_else(|_| Self::default(), Self::new)
    }

    /// Load settings from a TOML file
    ///
    /// A file without a `base_url` key yields the default URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&raw)?;
        Ok(file
            .backend
            .base_url
            .map_or_else(Self::default, Self::new))
    }

    /// Resolve settings from environment, then config file, then default
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] only when a config file exists and is
    /// malformed; a missing file falls through to the default.
    pub fn resolve() -> Result<Self, ConfigError> {
        if let Ok(url) = std::env::var("EDUFLOW_BACKEND_URL")
            .or_else(|_| std::env::var("BACKEND_API_URL"))
        {
            return Ok(Self::new(url));
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                let settings = Self::load_from_path(&path)?;
                tracing::debug!(path = ?path, url = %settings.base_url, "loaded backend settings");
                return Ok(settings);
            }
        }

        Ok(Self::default())
    }
}

/// Default config file location (`$XDG_CONFIG_HOME/eduflow/config.toml`)
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("eduflow").join("config.toml"))
}

/// Strip trailing slashes so URL joins never produce `//`
fn normalize(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}
