//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::HistoryServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Name of the configuration file looked up inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "history-server.toml";

/// Error type for configuration problems.
///
/// Every variant is fatal: the server refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("{0} was not configured")]
    MissingOption(&'static str),

    #[error("failed to validate any of the {configured} configured archive locations")]
    NoValidLocations { configured: usize },

    #[error("failed to initialize TLS for the web frontend: {0}")]
    Tls(#[source] std::io::Error),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<HistoryServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: HistoryServerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load configuration from [`CONFIG_FILE_NAME`] inside `dir`.
pub fn load_config_dir(dir: &Path) -> Result<HistoryServerConfig, ConfigError> {
    load_config(&dir.join(CONFIG_FILE_NAME))
}
