//! Dashboard bootstrap descriptor.
//!
//! The dashboard frontend fetches `/config` before anything else to learn how
//! often to refresh and which timezone and version to display.
//!
//! `timezone-name` is the fixed offset label (`UTC`, `UTC+05:30`) rather than
//! a zone display name such as "Central European Time"; only the offset is
//! known from a `FixedOffset` timestamp.

use chrono::{DateTime, FixedOffset, Offset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cache::write_atomic;

/// File name of the descriptor inside the cache directory.
pub const DESCRIPTOR_FILE_NAME: &str = "config.json";

/// Version reported to the dashboard.
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Revision reported to the dashboard, injected at build time.
pub const SERVICE_REVISION: &str = match option_env!("HISTORY_SERVER_REVISION") {
    Some(revision) => revision,
    None => "unknown",
};

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to encode descriptor: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The document served under `/config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DashboardDescriptor {
    /// Dashboard refresh interval in milliseconds.
    pub refresh_interval: u64,
    /// Offset of the server's timezone from UTC in milliseconds.
    pub timezone_offset: i64,
    pub timezone_name: String,
    pub service_version: String,
    pub service_revision: String,
}

impl DashboardDescriptor {
    /// Build a descriptor for a server generating it at `generated_at`.
    pub fn new(refresh_interval: Duration, generated_at: DateTime<FixedOffset>) -> Self {
        let offset = generated_at.offset().fix();
        let offset_secs = offset.local_minus_utc();
        let timezone_name = if offset_secs == 0 {
            "UTC".to_string()
        } else {
            format!("UTC{offset}")
        };

        Self {
            refresh_interval: refresh_interval.as_millis() as u64,
            timezone_offset: i64::from(offset_secs) * 1000,
            timezone_name,
            service_version: SERVICE_VERSION.to_string(),
            service_revision: SERVICE_REVISION.to_string(),
        }
    }

    /// Write the descriptor to [`DESCRIPTOR_FILE_NAME`] inside `dir`.
    ///
    /// The file is replaced atomically, so a concurrent reader sees either the
    /// previous document or the complete new one.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, DescriptorError> {
        let path = dir.join(DESCRIPTOR_FILE_NAME);
        let json = serde_json::to_vec(self)?;

        write_atomic(&path, &json).map_err(|source| {
            tracing::error!(path = %path.display(), error = %source, "Failed to write dashboard descriptor");
            DescriptorError::Write {
                path: path.clone(),
                source,
            }
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_field_names() {
        let generated_at = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .unwrap();
        let descriptor = DashboardDescriptor::new(Duration::from_secs(10), generated_at);

        let value = serde_json::to_value(&descriptor).unwrap();
        let object = value.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "refresh-interval",
                "service-revision",
                "service-version",
                "timezone-name",
                "timezone-offset"
            ]
        );
        assert_eq!(value["refresh-interval"], 10_000);
        assert_eq!(value["timezone-offset"], 0);
        assert_eq!(value["timezone-name"], "UTC");
        assert_eq!(value["service-version"], SERVICE_VERSION);
    }

    #[test]
    fn test_offset_follows_timestamp() {
        let east = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let generated_at = east.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let descriptor = DashboardDescriptor::new(Duration::from_millis(1500), generated_at);
        assert_eq!(descriptor.timezone_offset, 19_800_000);
        assert_eq!(descriptor.timezone_name, "UTC+05:30");

        let west = FixedOffset::west_opt(3 * 3600).unwrap();
        let descriptor = DashboardDescriptor::new(
            Duration::from_millis(1500),
            west.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        );
        assert_eq!(descriptor.timezone_offset, -10_800_000);
        assert_eq!(descriptor.timezone_name, "UTC-03:00");
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let generated_at = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .unwrap();
        let descriptor = DashboardDescriptor::new(Duration::from_millis(4321), generated_at);

        let path = descriptor.write_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(DESCRIPTOR_FILE_NAME));

        // Overwriting an existing descriptor
        descriptor.write_to(dir.path()).unwrap();

        let parsed: DashboardDescriptor =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(parsed, descriptor);
        assert_eq!(parsed.refresh_interval, 4321);
        assert_eq!(
            parsed.timezone_offset,
            i64::from(generated_at.offset().local_minus_utc()) * 1000
        );
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = DashboardDescriptor::new(
            Duration::from_secs(1),
            FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
        let err = descriptor.write_to(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, DescriptorError::Write { .. }));
    }
}
