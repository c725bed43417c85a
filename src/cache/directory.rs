//! Cache directory creation, removal and atomic writes.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Prefix of generated cache directory names.
pub const CACHE_DIR_PREFIX: &str = "history-server-web-";

/// Generate a fresh, unique cache directory path under the system temp dir.
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join(format!("{}{}", CACHE_DIR_PREFIX, Uuid::new_v4()))
}

/// Create the cache directory and its parents. An existing directory is fine.
pub fn create_cache_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// Recursively delete the cache directory. A missing directory is fine.
pub fn remove_cache_dir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Write `contents` to `target` by writing a sibling temp file and renaming it.
///
/// The parent directory must exist.
pub fn write_atomic(target: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = target.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", target.display()),
        )
    })?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_dir_is_unique() {
        let a = default_cache_dir();
        let b = default_cache_dir();
        assert_ne!(a, b);
        assert!(a
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(CACHE_DIR_PREFIX));
    }

    #[test]
    fn test_create_and_remove() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("cache");

        create_cache_dir(&dir).unwrap();
        create_cache_dir(&dir).unwrap(); // already exists
        fs::write(dir.join("file.json"), "{}").unwrap();

        remove_cache_dir(&dir).unwrap();
        assert!(!dir.exists());
        remove_cache_dir(&dir).unwrap(); // already gone
    }

    #[test]
    fn test_write_atomic_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("config.json");

        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
