//! Content-addressed page cache
//!
//! Maps a URL to the raw bytes of its last successful fetch. Each URL owns
//! exactly one file, named by the SHA-256 digest of the URL string. There is
//! no manifest and no expiry: the presence of the file is the index and the
//! proof of a completed fetch.

use crate::storage::{self, StorageError, StorageResult, TEMP_SUFFIX};
use crate::url::url_digest;
use std::fs;
use std::path::{Path, PathBuf};

const PAGE_EXTENSION: &str = "html";

/// On-disk cache of fetched pages
#[derive(Debug, Clone)]
pub struct ContentCache {
    dir: PathBuf,
}

impl ContentCache {
    /// Opens (creating if needed) the cache directory
    ///
    /// Temp files left behind by an interrupted write are removed here; they
    /// never count as hits because hits only look at final file names.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let cache = Self { dir };
        let swept = cache.sweep_temp_files()?;
        if swept > 0 {
            tracing::debug!("Removed {} partial cache writes", swept);
        }
        Ok(cache)
    }

    /// Attaches to an existing cache directory without creating or sweeping it
    ///
    /// Returns `None` if `dir` is not a directory. Used by read-only modes.
    pub fn existing(dir: impl Into<PathBuf>) -> Option<Self> {
        let dir = dir.into();
        dir.is_dir().then_some(Self { dir })
    }

    /// The cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds (or would hold) the bytes for `url`
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", url_digest(url), PAGE_EXTENSION))
    }

    /// Returns the cached bytes for `url`, or `None` on a miss
    pub fn get(&self, url: &str) -> StorageResult<Option<Vec<u8>>> {
        storage::read_if_exists(&self.path_for(url))
    }

    /// Stores `bytes` as the cached copy of `url`, replacing any previous copy
    pub fn put(&self, url: &str, bytes: &[u8]) -> StorageResult<()> {
        storage::write_atomic(&self.path_for(url), bytes)
    }

    /// Number of cached pages
    pub fn len(&self) -> StorageResult<usize> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;
        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.dir, e))?;
            if entry.path().extension().is_some_and(|ext| ext == PAGE_EXTENSION) {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    fn sweep_temp_files(&self) -> StorageResult<usize> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;
        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(|e| StorageError::io(&self.dir, e))?.path();
            let is_temp = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(TEMP_SUFFIX));
            if is_temp && storage::remove_if_exists(&path)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
