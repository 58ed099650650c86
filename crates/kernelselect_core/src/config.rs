//! Selector configuration.
//!
//! # Responsibility
//! - Describe where the catalog lives and how logging is set up.
//! - Load that description from JSON text or a file.
//!
//! # Invariants
//! - `base_url` is non-empty after loading.

use crate::kernelspec::catalog::{url_join_encode, CATALOG_PATH};
use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Top-level coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectorConfig {
    /// Notebook server base URL, absolute or origin-relative.
    pub base_url: String,
    /// Catalog endpoint path relative to `base_url`.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Absolute directory for rolling log files; stderr when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_dir: None,
        }
    }
}

impl SelectorConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            catalog_path: default_catalog_path(),
            logging: LoggingConfig::default(),
        }
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        Ok(())
    }

    /// Fully joined and encoded catalog URL.
    pub fn catalog_url(&self) -> String {
        url_join_encode(&self.base_url, &self.catalog_path)
    }
}

fn default_catalog_path() -> String {
    CATALOG_PATH.to_string()
}

fn default_level() -> String {
    default_log_level().to_string()
}

/// Configuration loading errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    EmptyBaseUrl,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::EmptyBaseUrl => write!(f, "base_url cannot be empty"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::EmptyBaseUrl => None,
        }
    }
}
