//! Configuration loading traits and types.
//!
//! Every balance binary reads its settings from a single TOML file. This
//! module provides the error type and the blanket loader used for it.
//!
//! # Usage
//!
//! ```rust,no_run
//! use balance_common::config::{ConfigError, ConfigLoader};
//! use balance_common::control_unit::config::BalanceConfig;
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = BalanceConfig::load(Path::new("balance.toml"))?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// File could not be read.
    #[error("Failed to read configuration: {0}")]
    ReadError(String),

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Preset name does not match any known preset.
    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ReadError` for any other I/O failure
/// - Returns `ConfigError::ParseError` if TOML syntax or shape is invalid
///
/// Semantic validation is left to the caller.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ReadError(e.to_string())
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| {
            debug!("configuration parse failed: {e}");
            ConfigError::ParseError(e.to_string())
        })
    }
}

// Any serde-deserializable struct can be loaded this way.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
