//! Progress ledger: which URLs are done, and how
//!
//! Two plain-text files, one URL per line:
//! - the *processed* file lists URLs that became catalog entries
//! - the *rejected* file (`<stem>_skipped<ext>`) lists URLs that were fetched
//!   but classified as non-entries
//!
//! Both files are append-only during a run. The in-memory sets mirror them
//! and are what the orchestrator consults; the files are synced to disk at
//! every checkpoint.

use crate::storage::{self, StorageError, StorageResult};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

const REJECTED_SUFFIX: &str = "_skipped";
const DEFAULT_EXTENSION: &str = "txt";

/// What the ledger knows about a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerStatus {
    /// Became a catalog entry
    Processed,
    /// Fetched and classified as a non-entry
    Rejected,
    /// Never settled; eligible for fetching
    Unknown,
}

impl LedgerStatus {
    /// Returns true if the URL should not be fetched again
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Processed => "processed",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Derives the rejected-ledger path from the processed-ledger path
///
/// Works regardless of extension; a path without one gets `.txt`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use wikidex::ledger::rejected_path_for;
///
/// assert_eq!(rejected_path_for(Path::new("progress.txt")), Path::new("progress_skipped.txt"));
/// assert_eq!(rejected_path_for(Path::new("progress")), Path::new("progress_skipped.txt"));
/// ```
pub fn rejected_path_for(processed: &Path) -> PathBuf {
    let stem = processed
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = processed
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    processed.with_file_name(format!("{}{}.{}", stem, REJECTED_SUFFIX, ext))
}

/// One of the two append-only URL lists
#[derive(Debug)]
struct UrlList {
    path: PathBuf,
    urls: HashSet<String>,
    writer: Option<File>,
    existed: bool,
    needs_newline: bool,
}

impl UrlList {
    fn load(path: PathBuf) -> StorageResult<Self> {
        let (urls, existed, needs_newline) = match storage::read_if_exists(&path)? {
            Some(bytes) => (
                parse_lines(&bytes, &path),
                true,
                bytes.last().is_some_and(|b| *b != b'\n'),
            ),
            None => (HashSet::new(), false, false),
        };
        Ok(Self {
            path,
            urls,
            writer: None,
            existed,
            needs_newline,
        })
    }

    fn append(&mut self, url: &str) -> StorageResult<()> {
        if self.writer.is_none() {
            self.writer = Some(storage::open_append(&self.path)?);
        }
        if let Some(writer) = self.writer.as_mut() {
            // A hand-edited file may lack its final newline
            if self.needs_newline {
                writer
                    .write_all(b"\n")
                    .map_err(|e| StorageError::io(&self.path, e))?;
                self.needs_newline = false;
            }
            writeln!(writer, "{}", url)
                .and_then(|_| writer.flush())
                .map_err(|e| StorageError::io(&self.path, e))?;
        }
        self.existed = true;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .sync_all()
                .map_err(|e| StorageError::io(&self.path, e))?;
        }
        Ok(())
    }
}

/// Parses a ledger file, skipping lines that are not valid URLs
fn parse_lines(bytes: &[u8], path: &Path) -> HashSet<String> {
    let mut urls = HashSet::new();
    for (index, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim(),
            Err(_) => {
                tracing::warn!(
                    "Skipping non-UTF-8 line {} in {}",
                    index + 1,
                    path.display()
                );
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        if Url::parse(line).is_err() {
            tracing::warn!(
                "Skipping unparseable line {} in {}: {:?}",
                index + 1,
                path.display(),
                line
            );
            continue;
        }
        urls.insert(line.to_string());
    }
    urls
}

/// Durable record of settled URLs
///
/// # Invariants
///
/// - A URL is in at most one of the two sets. The first settlement wins:
///   marking a URL that is already in the other set is ignored with a warning,
///   since the files are append-only and cannot retract a line.
/// - Re-marking a URL already in the same set is a no-op.
#[derive(Debug)]
pub struct ProgressLedger {
    processed: UrlList,
    rejected: UrlList,
}

impl ProgressLedger {
    /// Loads both ledger files (missing files are treated as empty)
    ///
    /// Corrupt lines are skipped with a warning. If a URL somehow appears in
    /// both files, the processed set keeps it.
    pub fn open(processed_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let processed_path = processed_path.into();
        let rejected_path = rejected_path_for(&processed_path);

        let processed = UrlList::load(processed_path)?;
        let mut rejected = UrlList::load(rejected_path)?;

        let overlap: Vec<String> = rejected
            .urls
            .intersection(&processed.urls)
            .cloned()
            .collect();
        for url in overlap {
            tracing::warn!("{} is in both ledgers; keeping it as processed", url);
            rejected.urls.remove(&url);
        }

        tracing::debug!(
            "Ledger loaded: {} processed, {} rejected",
            processed.urls.len(),
            rejected.urls.len()
        );

        Ok(Self {
            processed,
            rejected,
        })
    }

    /// Deletes both ledger files (rebuild mode)
    pub fn clear(processed_path: &Path) -> StorageResult<()> {
        for path in [processed_path.to_path_buf(), rejected_path_for(processed_path)] {
            if storage::remove_if_exists(&path)? {
                tracing::info!("Removed ledger file {}", path.display());
            }
        }
        Ok(())
    }

    pub fn status(&self, url: &str) -> LedgerStatus {
        if self.processed.urls.contains(url) {
            LedgerStatus::Processed
        } else if self.rejected.urls.contains(url) {
            LedgerStatus::Rejected
        } else {
            LedgerStatus::Unknown
        }
    }

    pub fn is_known(&self, url: &str) -> bool {
        self.status(url).is_known()
    }

    /// Records `url` as a catalog entry
    ///
    /// Returns true if the ledger changed.
    pub fn mark_processed(&mut self, url: &str) -> StorageResult<bool> {
        match self.status(url) {
            LedgerStatus::Processed => Ok(false),
            LedgerStatus::Rejected => {
                tracing::warn!("Ignoring processed mark for rejected URL {}", url);
                Ok(false)
            }
            LedgerStatus::Unknown => {
                self.processed.append(url)?;
                self.processed.urls.insert(url.to_string());
                Ok(true)
            }
        }
    }

    /// Records `url` as a non-entry
    ///
    /// Returns true if the ledger changed.
    pub fn mark_rejected(&mut self, url: &str) -> StorageResult<bool> {
        match self.status(url) {
            LedgerStatus::Rejected => Ok(false),
            LedgerStatus::Processed => {
                tracing::warn!("Ignoring rejected mark for processed URL {}", url);
                Ok(false)
            }
            LedgerStatus::Unknown => {
                self.rejected.append(url)?;
                self.rejected.urls.insert(url.to_string());
                Ok(true)
            }
        }
    }

    /// Returns true if the processed file exists and lists at least one URL
    pub fn has_processed_file(&self) -> bool {
        self.processed.existed && !self.processed.urls.is_empty()
    }

    /// Rebuilds the processed set from checkpoint URLs
    ///
    /// The file is written once, sorted, via write-temp-then-rename, so a
    /// crash cannot leave a half-written or duplicated ledger.
    pub fn reconstruct_processed<I, S>(&mut self, urls: I) -> StorageResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sorted: Vec<String> = urls
            .into_iter()
            .map(Into::into)
            .filter(|url| !url.is_empty())
            .collect();
        sorted.sort();
        sorted.dedup();

        let mut contents = String::new();
        for url in &sorted {
            contents.push_str(url);
            contents.push('\n');
        }
        storage::write_atomic(&self.processed.path, contents.as_bytes())?;

        // Drop the stale handle so later appends reopen the renamed file
        self.processed.writer = None;
        self.processed.existed = true;
        self.processed.needs_newline = false;
        for url in &sorted {
            self.rejected.urls.remove(url);
        }
        self.processed.urls = sorted.into_iter().collect();

        Ok(self.processed.urls.len())
    }

    /// Records every catalog URL the ledger does not list as processed
    ///
    /// Used when the processed file exists but lacks some checkpoint rows.
    /// A URL found in the rejected set is moved to processed in memory; the
    /// appended processed line makes the same choice on the next load.
    /// Returns how many URLs were added.
    pub fn backfill_processed<'a, I>(&mut self, urls: I) -> StorageResult<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut added = 0;
        for url in urls {
            match self.status(url) {
                LedgerStatus::Processed => continue,
                LedgerStatus::Rejected => {
                    tracing::warn!("{} has a catalog row; keeping it as processed", url);
                    self.rejected.urls.remove(url);
                }
                LedgerStatus::Unknown => {}
            }
            self.processed.append(url)?;
            self.processed.urls.insert(url.to_string());
            added += 1;
        }
        Ok(added)
    }

    /// Forgets processed URLs that fail `keep`, in memory only
    ///
    /// The dropped URLs become `Unknown` for this run and will be fetched
    /// (normally from cache) again. Returns how many were dropped.
    pub fn retain_processed<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.processed.urls.len();
        self.processed.urls.retain(|url| keep(url));
        before - self.processed.urls.len()
    }

    /// Forces both files to durable storage
    pub fn sync(&mut self) -> StorageResult<()> {
        self.processed.sync()?;
        self.rejected.sync()
    }

    pub fn processed_count(&self) -> usize {
        self.processed.urls.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.urls.len()
    }

    pub fn processed_path(&self) -> &Path {
        &self.processed.path
    }

    pub fn rejected_path(&self) -> &Path {
        &self.rejected.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const A: &str = "https://example.com/wiki/A";
    const B: &str = "https://example.com/wiki/B";

    fn ledger_in(dir: &TempDir) -> ProgressLedger {
        ProgressLedger::open(dir.path().join("progress.txt")).unwrap()
    }

    #[test]
    fn test_rejected_path_extensions() {
        assert_eq!(
            rejected_path_for(Path::new("progress.txt")),
            Path::new("progress_skipped.txt")
        );
        assert_eq!(
            rejected_path_for(Path::new("progress.json")),
            Path::new("progress_skipped.json")
        );
        assert_eq!(
            rejected_path_for(Path::new("progress")),
            Path::new("progress_skipped.txt")
        );
        assert_eq!(
            rejected_path_for(Path::new("/data/runs/progress.txt")),
            Path::new("/data/runs/progress_skipped.txt")
        );
        assert_eq!(
            rejected_path_for(Path::new("progress.tar.gz")),
            Path::new("progress.tar_skipped.gz")
        );
    }

    #[test]
    fn test_missing_files_are_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);

        assert_eq!(ledger.status(A), LedgerStatus::Unknown);
        assert_eq!(ledger.processed_count(), 0);
        assert!(!ledger.has_processed_file());
    }

    #[test]
    fn test_mark_and_reload() {
        let dir = TempDir::new().unwrap();
        {
            let mut ledger = ledger_in(&dir);
            assert!(ledger.mark_processed(A).unwrap());
            assert!(ledger.mark_rejected(B).unwrap());
            ledger.sync().unwrap();
        }

        let ledger = ledger_in(&dir);
        assert_eq!(ledger.status(A), LedgerStatus::Processed);
        assert_eq!(ledger.status(B), LedgerStatus::Rejected);

        let processed = fs::read_to_string(dir.path().join("progress.txt")).unwrap();
        let rejected = fs::read_to_string(dir.path().join("progress_skipped.txt")).unwrap();
        assert_eq!(processed, format!("{}\n", A));
        assert_eq!(rejected, format!("{}\n", B));
    }

    #[test]
    fn test_remark_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ledger_in(&dir);

        assert!(ledger.mark_processed(A).unwrap());
        assert!(!ledger.mark_processed(A).unwrap());
        assert!(ledger.mark_rejected(B).unwrap());
        assert!(!ledger.mark_rejected(B).unwrap());

        assert_eq!(ledger.processed_count(), 1);
        assert_eq!(ledger.rejected_count(), 1);

        let processed = fs::read_to_string(ledger.processed_path()).unwrap();
        assert_eq!(processed.lines().count(), 1);
    }

    #[test]
    fn test_sets_stay_disjoint() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ledger_in(&dir);

        ledger.mark_processed(A).unwrap();
        assert!(!ledger.mark_rejected(A).unwrap());
        ledger.mark_rejected(B).unwrap();
        assert!(!ledger.mark_processed(B).unwrap());

        assert_eq!(ledger.status(A), LedgerStatus::Processed);
        assert_eq!(ledger.status(B), LedgerStatus::Rejected);
        assert_eq!(ledger.processed_count() + ledger.rejected_count(), 2);
    }

    #[test]
    fn test_overlapping_files_prefer_processed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("progress.txt"), format!("{}\n", A)).unwrap();
        fs::write(
            dir.path().join("progress_skipped.txt"),
            format!("{}\n{}\n", A, B),
        )
        .unwrap();

        let ledger = ledger_in(&dir);
        assert_eq!(ledger.status(A), LedgerStatus::Processed);
        assert_eq!(ledger.rejected_count(), 1);
    }

    #[test]
    fn test_corrupt_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let mut bytes = format!("{}\nnot a url\n\n", A).into_bytes();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        bytes.extend_from_slice(format!("  {}  \n", B).as_bytes());
        fs::write(dir.path().join("progress.txt"), bytes).unwrap();

        let ledger = ledger_in(&dir);
        assert_eq!(ledger.processed_count(), 2);
        assert_eq!(ledger.status(A), LedgerStatus::Processed);
        assert_eq!(ledger.status(B), LedgerStatus::Processed);
    }

    #[test]
    fn test_missing_trailing_newline() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("progress.txt"), A).unwrap();

        let mut ledger = ledger_in(&dir);
        assert_eq!(ledger.status(A), LedgerStatus::Processed);

        ledger.mark_processed(B).unwrap();
        let ledger = ledger_in(&dir);
        assert_eq!(ledger.status(A), LedgerStatus::Processed);
        assert_eq!(ledger.status(B), LedgerStatus::Processed);
    }

    #[test]
    fn test_reconstruct_processed() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ledger_in(&dir);

        let count = ledger
            .reconstruct_processed(vec![B.to_string(), A.to_string(), A.to_string()])
            .unwrap();
        assert_eq!(count, 2);

        let contents = fs::read_to_string(ledger.processed_path()).unwrap();
        assert_eq!(contents, format!("{}\n{}\n", A, B));
        assert!(ledger.has_processed_file());

        // Appending after reconstruction extends the rewritten file
        ledger
            .mark_processed("https://example.com/wiki/C")
            .unwrap();
        let contents = fs::read_to_string(ledger.processed_path()).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_retain_processed() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.mark_processed(A).unwrap();
        ledger.mark_processed(B).unwrap();

        let dropped = ledger.retain_processed(|url| url == A);

        assert_eq!(dropped, 1);
        assert_eq!(ledger.status(B), LedgerStatus::Unknown);
    }

    #[test]
    fn test_backfill_processed() {
        let dir = TempDir::new().unwrap();
        let c = "https://example.com/wiki/C";
        {
            let mut ledger = ledger_in(&dir);
            ledger.mark_processed(A).unwrap();
            ledger.mark_rejected(c).unwrap();
        }

        let mut ledger = ledger_in(&dir);
        let added = ledger.backfill_processed([A, B, c]).unwrap();

        assert_eq!(added, 2);
        assert_eq!(ledger.status(B), LedgerStatus::Processed);
        assert_eq!(ledger.status(c), LedgerStatus::Processed);
        assert_eq!(ledger.rejected_count(), 0);

        // The choice survives a reload even though the rejected line remains
        drop(ledger);
        let reloaded = ledger_in(&dir);
        assert_eq!(reloaded.status(B), LedgerStatus::Processed);
        assert_eq!(reloaded.status(c), LedgerStatus::Processed);
    }

    #[test]
    fn test_clear_removes_both_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.txt");
        {
            let mut ledger = ledger_in(&dir);
            ledger.mark_processed(A).unwrap();
            ledger.mark_rejected(B).unwrap();
        }

        ProgressLedger::clear(&path).unwrap();

        assert!(!path.exists());
        assert!(!rejected_path_for(&path).exists());
        let ledger = ledger_in(&dir);
        assert_eq!(ledger.status(A), LedgerStatus::Unknown);
        assert_eq!(ledger.status(B), LedgerStatus::Unknown);
    }
}
