//! Durable file primitives shared by the cache, ledger and checkpoints
//!
//! Every whole-file write goes through [`write_atomic`]: the bytes land in a
//! sibling temp file, are flushed to disk, and only then renamed over the
//! target. A crash mid-write leaves at most a stray temp file, never a
//! truncated target.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix appended to in-flight temp files
pub const TEMP_SUFFIX: &str = ".tmp";

/// Errors that can occur while touching durable storage
///
/// Storage failures end the run: continuing would leave the cache, ledger
/// and checkpoints disagreeing with each other.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("CSV error on {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("JSON error on {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl StorageError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Path of the temp file used while writing `path`
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Writes `bytes` to `path` via write-temp-then-rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    ensure_parent_dir(path)?;

    let temp = temp_path_for(path);
    let mut file = File::create(&temp).map_err(|e| StorageError::io(&temp, e))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| StorageError::io(&temp, e))?;
    drop(file);

    fs::rename(&temp, path).map_err(|e| StorageError::io(path, e))
}

/// Creates the parent directory of `path` if it has one
pub fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Opens `path` for appending, creating it (and its parent) if missing
pub fn open_append(path: &Path) -> StorageResult<File> {
    ensure_parent_dir(path)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StorageError::io(path, e))
}

/// Removes `path`, treating "already gone" as success
///
/// Returns true if a file was actually removed.
pub fn remove_if_exists(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

/// Reads `path`, returning `None` if it does not exist
pub fn read_if_exists(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}
