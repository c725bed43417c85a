//! Errors surfaced by the history server's construction and startup.

use std::path::PathBuf;
use thiserror::Error;

use crate::archive::FetchError;
use crate::config::ConfigError;
use crate::dashboard::DescriptorError;
use crate::lifecycle::LifecycleState;

#[derive(Debug, Error)]
pub enum HistoryServerError {
    /// Invalid or incomplete configuration, detected at construction.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create local cache directory {}: {source}", .path.display())]
    CacheDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("failed to start archive fetcher: {0}")]
    Fetcher(#[from] FetchError),

    #[error("failed to start web server on {address}:{port}: {source}")]
    WebServer {
        address: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot {operation} history server in state {state:?}")]
    IllegalState {
        operation: &'static str,
        state: LifecycleState,
    },
}

pub type Result<T> = std::result::Result<T, HistoryServerError>;
