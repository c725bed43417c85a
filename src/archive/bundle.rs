//! Job archive format and unpacking into the cache directory.
//!
//! An archive is a JSON document produced when a job finishes:
//!
//! ```json
//! {"archive": [
//!     {"path": "/joboverview", "json": "{\"finished\": [...]}"},
//!     {"path": "/jobs/<id>", "json": "{...}"},
//!     {"path": "/jobs/<id>/vertices", "json": "{...}"}
//! ]}
//! ```
//!
//! Each entry becomes `<cache><path>.json`. The `/joboverview` entry is kept
//! per archive under `overviews/` and merged into `<cache>/joboverview.json`.
//! Entries at `/config` are skipped; that file belongs to the dashboard
//! descriptor.

use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cache::write_atomic;

/// Path of the per-archive job overview entry.
pub const OVERVIEW_ENTRY: &str = "/joboverview";
/// Directory (relative to the cache root) holding per-archive overviews.
pub const OVERVIEWS_DIR: &str = "overviews";
/// Merged overview served under `/joboverview`.
pub const OVERVIEW_FILE_NAME: &str = "joboverview.json";
/// Entry paths owned by the server itself, never taken from an archive.
pub const RESERVED_ENTRIES: &[&str] = &["/config"];

/// Errors while unpacking a single archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed archive: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("archive name '{0}' is not a valid file name")]
    InvalidName(String),

    #[error("archive entry path '{0}' escapes the cache directory")]
    InvalidEntryPath(String),
}

#[derive(Debug, Deserialize)]
struct JobArchive {
    archive: Vec<ArchivedJson>,
}

#[derive(Debug, Deserialize)]
struct ArchivedJson {
    path: String,
    json: String,
}

fn check_name(name: &str) -> Result<(), ArchiveError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ArchiveError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Map an archive entry path to its file under `cache_dir`.
fn entry_target(cache_dir: &Path, archive_name: &str, entry_path: &str) -> Result<PathBuf, ArchiveError> {
    if entry_path == OVERVIEW_ENTRY {
        return Ok(cache_dir
            .join(OVERVIEWS_DIR)
            .join(format!("{archive_name}.json")));
    }

    let relative = entry_path
        .strip_prefix('/')
        .ok_or_else(|| ArchiveError::InvalidEntryPath(entry_path.to_string()))?;
    let segments: Vec<&str> = relative.split('/').collect();
    if segments
        .iter()
        .any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains('\\'))
    {
        return Err(ArchiveError::InvalidEntryPath(entry_path.to_string()));
    }

    let mut target = cache_dir.to_path_buf();
    for segment in &segments[..segments.len() - 1] {
        target.push(segment);
    }
    target.push(format!("{}.json", segments[segments.len() - 1]));
    Ok(target)
}

/// Unpack an archive's entries into `cache_dir`. Returns the number of files written.
///
/// The archive is fully parsed and validated before the first file is written.
pub fn unpack_archive(cache_dir: &Path, archive_name: &str, bytes: &[u8]) -> Result<usize, ArchiveError> {
    check_name(archive_name)?;
    let archive: JobArchive = serde_json::from_slice(bytes)?;

    let mut planned = Vec::with_capacity(archive.archive.len());
    for entry in &archive.archive {
        if RESERVED_ENTRIES.contains(&entry.path.as_str()) {
            tracing::warn!(archive = %archive_name, path = %entry.path, "Skipping reserved archive entry");
            continue;
        }
        serde_json::from_str::<Value>(&entry.json)?;
        planned.push((entry_target(cache_dir, archive_name, &entry.path)?, entry.json.as_bytes()));
    }

    for (target, contents) in &planned {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        write_atomic(target, contents)?;
    }
    Ok(planned.len())
}

/// Write an empty merged overview if none exists yet.
pub fn init_overview(cache_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(cache_dir.join(OVERVIEWS_DIR))?;
    let target = cache_dir.join(OVERVIEW_FILE_NAME);
    if target.exists() {
        return Ok(());
    }
    write_atomic(&target, empty_overview().to_string().as_bytes())
}

fn empty_overview() -> Value {
    serde_json::json!({ "running": [], "finished": [] })
}

/// Rebuild `joboverview.json` from every per-archive overview.
///
/// Overviews list their jobs under `finished` (or `jobs`). Unreadable
/// overviews are skipped. Returns the number of jobs in the merged overview.
pub fn update_overview(cache_dir: &Path) -> io::Result<usize> {
    let overviews_dir = cache_dir.join(OVERVIEWS_DIR);
    let mut files: Vec<PathBuf> = match fs::read_dir(&overviews_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e),
    };
    files.sort();

    let mut finished = Vec::new();
    for file in files {
        let overview: Value = match fs::read(&file)
            .map_err(|e| e.to_string())
            .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|e| e.to_string()))
        {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Skipping unreadable job overview");
                continue;
            }
        };

        let jobs = overview
            .get("finished")
            .or_else(|| overview.get("jobs"))
            .and_then(Value::as_array);
        if let Some(jobs) = jobs {
            finished.extend(jobs.iter().cloned());
        }
    }

    let count = finished.len();
    let mut merged = empty_overview();
    merged["finished"] = Value::Array(finished);
    write_atomic(&cache_dir.join(OVERVIEW_FILE_NAME), merged.to_string().as_bytes())?;
    Ok(count)
}
