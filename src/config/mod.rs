//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! <config-dir>/history-server.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HistoryServerConfig
//!     → lifecycle::HistoryServer::builder (resolve locations, load TLS)
//!     → ServiceConfig (validated, immutable for the server's lifetime)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the server is constructed; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_dir, ConfigError, CONFIG_FILE_NAME};
pub use schema::{ArchiveConfig, HistoryServerConfig, ObservabilityConfig, SslConfig, WebConfig};
pub use validation::{validate_config, ValidationError};
