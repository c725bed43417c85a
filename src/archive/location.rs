//! Archive location resolution.
//!
//! Turns the configured, comma-separated list of archive location URIs into
//! validated [`RefreshLocation`]s. Each entry is validated independently: a
//! bad entry is logged and dropped, and resolution only fails if nothing
//! survives.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::archive::backend::{BackendRegistry, StorageBackend};
use crate::config::ConfigError;

/// Separator between entries of the archive location list.
pub const LOCATION_SEPARATOR: char = ',';

/// Why a single archive location was rejected.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("malformed location URI: {0}")]
    Malformed(#[from] url::ParseError),

    #[error("location URI has no path")]
    NoPath,

    #[error("location path must not contain '..' segments")]
    ParentSegment,

    #[error("no storage backend registered for scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("storage backend for '{scheme}' rejected the location: {reason}")]
    Rejected { scheme: String, reason: String },
}

/// A validated archive location and the storage backend that serves it.
#[derive(Clone)]
pub struct RefreshLocation {
    uri: Url,
    backend: Arc<dyn StorageBackend>,
}

impl RefreshLocation {
    /// The normalized location URI.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// The normalized path component of the location.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }
}

impl fmt::Debug for RefreshLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshLocation")
            .field("uri", &self.uri.as_str())
            .field("backend", &self.backend.scheme())
            .finish()
    }
}

impl fmt::Display for RefreshLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri.as_str())
    }
}

/// Parse and normalize a single location URI.
///
/// Empty path segments and trailing slashes are removed so that
/// `file:///a//b/` and `file:///a/b` name the same location.
pub fn normalize_location(raw: &str) -> Result<Url, LocationError> {
    let mut uri = Url::parse(raw.trim())?;
    if uri.cannot_be_a_base() {
        return Err(LocationError::NoPath);
    }

    let segments: Vec<String> = match uri.path_segments() {
        Some(segments) => segments
            .filter(|s| !s.is_empty() && *s != ".")
            .map(str::to_string)
            .collect(),
        None => return Err(LocationError::NoPath),
    };
    if segments.iter().any(|s| s == "..") {
        return Err(LocationError::ParentSegment);
    }

    uri.set_path(&format!("/{}", segments.join("/")));
    uri.set_query(None);
    uri.set_fragment(None);
    Ok(uri)
}

/// Normalize `raw` and bind it to a backend from `registry`.
pub fn resolve_location(
    raw: &str,
    registry: &BackendRegistry,
) -> Result<RefreshLocation, LocationError> {
    let uri = normalize_location(raw)?;
    let backend = registry
        .get(uri.scheme())
        .ok_or_else(|| LocationError::UnsupportedScheme(uri.scheme().to_string()))?;
    backend.bind(&uri)?;

    Ok(RefreshLocation { uri, backend })
}

/// Resolve every entry of a comma-separated location list.
///
/// Entries that fail validation are logged and dropped. Fails if the list is
/// absent or if no entry survives. The result keeps the input order.
pub fn resolve_locations(
    raw: Option<&str>,
    registry: &BackendRegistry,
) -> Result<Vec<RefreshLocation>, ConfigError> {
    let raw = raw.ok_or(ConfigError::MissingOption("archive.dirs"))?;

    let mut configured = 0;
    let mut locations = Vec::new();
    for entry in raw.split(LOCATION_SEPARATOR).map(str::trim) {
        if entry.is_empty() {
            continue;
        }
        configured += 1;

        match resolve_location(entry, registry) {
            Ok(location) => {
                tracing::debug!(location = %location, "Monitoring archive location");
                locations.push(location);
            }
            Err(e) => {
                tracing::warn!(
                    location = %entry,
                    error = %e,
                    "Failed to validate archive location, it will not be monitored"
                );
            }
        }
    }

    if locations.is_empty() {
        return Err(ConfigError::NoValidLocations { configured });
    }
    Ok(locations)
}
