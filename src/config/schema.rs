//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the history
//! server. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the history server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HistoryServerConfig {
    /// Web frontend settings (bind address, cache directory, TLS).
    pub web: WebConfig,

    /// Archive locations and polling cadence.
    pub archive: ArchiveConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Web frontend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebConfig {
    /// Address the web frontend binds to (e.g., "0.0.0.0").
    pub address: String,

    /// Port the web frontend binds to. 0 picks an ephemeral port.
    pub port: u16,

    /// Refresh interval advertised to the dashboard, in milliseconds.
    pub refresh_interval_ms: u64,

    /// Local cache directory. A fresh temporary directory is generated if unset.
    pub tmp_dir: Option<PathBuf>,

    /// Grace period for in-flight requests on shutdown, in milliseconds.
    pub shutdown_grace_ms: u64,

    /// TLS settings for the web frontend.
    pub ssl: SslConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8082,
            refresh_interval_ms: 10_000,
            tmp_dir: None,
            shutdown_grace_ms: 5_000,
            ssl: SslConfig::default(),
        }
    }
}

/// TLS configuration for the web frontend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SslConfig {
    /// Serve over HTTPS.
    pub enabled: bool,

    /// Path to certificate file (PEM).
    pub cert_path: Option<PathBuf>,

    /// Path to private key file (PEM).
    pub key_path: Option<PathBuf>,
}

/// Archive polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Comma-separated list of archive location URIs (e.g., "file:///a,file:///b").
    pub dirs: Option<String>,

    /// Interval between two polls of the archive locations, in milliseconds.
    pub refresh_interval_ms: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dirs: None,
            refresh_interval_ms: 10_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
