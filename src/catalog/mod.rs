//! Catalog store and checkpoints
//!
//! The [`CatalogStore`] is the in-memory list of accepted entries for a run.
//! A [`Checkpoint`] flushes it, in full, to the CSV and JSON exports and
//! loads it back at the start of the next run.

mod entry;
pub mod export;

pub use entry::{identifier, AttributeMap, CatalogEntry, ELEVATED_KEYS};

use crate::storage::StorageResult;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Accepted entries, in acceptance order, unique by identifier
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    entries: Vec<CatalogEntry>,
    ids: HashSet<String>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from loaded entries, dropping duplicate identifiers
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut store = Self::new();
        for entry in entries {
            if !store.push(entry) {
                tracing::debug!("Dropping duplicate catalog row");
            }
        }
        store
    }

    /// Appends an entry; returns false if one with the same identifier exists
    pub fn push(&mut self, entry: CatalogEntry) -> bool {
        if !self.ids.insert(entry.id.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.ids.contains(&identifier(url))
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn source_urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.url.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Locations of the durable exports
#[derive(Debug, Clone)]
pub struct Checkpoint {
    csv_path: PathBuf,
    json_path: PathBuf,
}

impl Checkpoint {
    pub fn new(csv_path: impl Into<PathBuf>, json_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            json_path: json_path.into(),
        }
    }

    /// Loads the previous run's catalog from the CSV export
    ///
    /// The CSV is the source of truth; the JSON export is write-only.
    pub fn load(&self) -> StorageResult<CatalogStore> {
        let entries = export::read_csv(&self.csv_path)?;
        Ok(CatalogStore::from_entries(entries))
    }

    /// Writes the full store to both exports
    pub fn flush(&self, store: &CatalogStore) -> StorageResult<()> {
        export::write_csv(store.entries(), &self.csv_path)?;
        export::write_json(store.entries(), &self.json_path)?;
        tracing::debug!(
            "Checkpoint written: {} entries to {} and {}",
            store.len(),
            self.csv_path.display(),
            self.json_path.display()
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }
}
