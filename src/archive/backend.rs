//! Storage backends that archive locations are bound to.
//!
//! # Responsibilities
//! - Define the operations the fetcher needs from a storage system
//! - Map URI schemes to backends
//! - Provide the local filesystem backend (`file://`)

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

use crate::archive::location::LocationError;

/// A storage system that archives can be listed and read from.
#[async_trait]
pub trait StorageBackend: fmt::Debug + Send + Sync {
    /// The URI scheme this backend serves (e.g. "file").
    fn scheme(&self) -> &str;

    /// Check that `location` can be served by this backend.
    ///
    /// Called once per location at server construction.
    fn bind(&self, location: &Url) -> Result<(), LocationError>;

    /// List the archive names directly under `location`.
    async fn list(&self, location: &Url) -> io::Result<Vec<String>>;

    /// Read the archive `name` under `location`.
    async fn read(&self, location: &Url, name: &str) -> io::Result<Vec<u8>>;
}

/// Backend for `file://` locations on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    fn to_path(location: &Url) -> io::Result<PathBuf> {
        location.to_file_path().map_err(|()| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{location} is not a local path"),
            )
        })
    }
}

#[async_trait]
impl StorageBackend for LocalFileSystem {
    fn scheme(&self) -> &str {
        "file"
    }

    fn bind(&self, location: &Url) -> Result<(), LocationError> {
        match location.host_str() {
            None | Some("") | Some("localhost") => {}
            Some(host) => {
                return Err(LocationError::Rejected {
                    scheme: self.scheme().to_string(),
                    reason: format!("remote host '{host}' is not reachable through the local filesystem"),
                })
            }
        }
        Self::to_path(location).map_err(|e| LocationError::Rejected {
            scheme: self.scheme().to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn list(&self, location: &Url) -> io::Result<Vec<String>> {
        let dir = Self::to_path(location)?;
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            // Hidden files are in-progress uploads by convention
            match entry.file_name().into_string() {
                Ok(name) if !name.starts_with('.') => names.push(name),
                Ok(_) => {}
                Err(raw) => {
                    tracing::debug!(dir = %dir.display(), name = ?raw, "Skipping non UTF-8 archive name");
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn read(&self, location: &Url, name: &str) -> io::Result<Vec<u8>> {
        let path = Self::to_path(location)?.join(name);
        tokio::fs::read(path).await
    }
}

/// Registry of storage backends keyed by URI scheme.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn StorageBackend>>,
}

impl BackendRegistry {
    /// An empty registry. Every location will be rejected.
    pub fn empty() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Register a backend under its scheme, replacing any previous one.
    pub fn register(&mut self, backend: Arc<dyn StorageBackend>) {
        self.backends
            .insert(backend.scheme().to_ascii_lowercase(), backend);
    }

    /// Look up the backend for `scheme`.
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn StorageBackend>> {
        self.backends.get(&scheme.to_ascii_lowercase()).cloned()
    }
}

impl Default for BackendRegistry {
    /// A registry with the local filesystem backend.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(LocalFileSystem));
        registry
    }
}
