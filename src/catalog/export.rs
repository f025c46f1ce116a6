//! Checkpoint export formats
//!
//! - CSV: one row per entry, fixed column order, extras as a compact JSON
//!   object in the last column. Unknown columns in an existing file are
//!   ignored on read.
//! - JSON: a pretty-printed array of entries.
//!
//! Both are written through [`write_atomic`], so a reader never sees a
//! half-written export.

use crate::catalog::entry::{AttributeMap, CatalogEntry};
use crate::storage::{read_if_exists, write_atomic, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tabular column order
pub const CSV_COLUMNS: [&str; 12] = [
    "ID",
    "Name",
    "URL",
    "ImageURL",
    "Type",
    "Color",
    "Squad",
    "Size(s)",
    "Collector Number",
    "Year",
    "Bio",
    "Extra",
];

/// CSV row shape; field order here is the column order above
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CsvRow {
    #[serde(rename = "ID")]
    id: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    #[serde(rename = "ImageURL")]
    image_url: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
    #[serde(rename = "Color")]
    color: Option<String>,
    #[serde(rename = "Squad")]
    squad: Option<String>,
    #[serde(rename = "Size(s)")]
    sizes: Option<String>,
    #[serde(rename = "Collector Number")]
    collector_number: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Bio")]
    bio: Option<String>,
    #[serde(rename = "Extra")]
    extra: Option<String>,
}

impl CsvRow {
    fn from_entry(entry: &CatalogEntry) -> Result<Self, serde_json::Error> {
        let extra = if entry.extra.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&entry.extra)?)
        };
        Ok(Self {
            id: Some(entry.id.clone()),
            name: Some(entry.name.clone()),
            url: Some(entry.url.clone()),
            image_url: entry.image_url.clone(),
            kind: entry.kind.clone(),
            color: entry.color.clone(),
            squad: entry.squad.clone(),
            sizes: entry.sizes.clone(),
            collector_number: entry.collector_number.clone(),
            year: entry.year.clone(),
            bio: entry.description.clone(),
            extra,
        })
    }

    /// Converts back to an entry; `None` if the row has no name or URL
    fn into_entry(self, path: &Path, row: usize) -> Option<CatalogEntry> {
        let name = non_empty(self.name)?;
        let url = non_empty(self.url)?;

        let extra = match non_empty(self.extra) {
            Some(raw) => serde_json::from_str::<AttributeMap>(&raw).unwrap_or_else(|e| {
                tracing::warn!(
                    "Unreadable Extra column in {} row {} ({}); dropping extras",
                    path.display(),
                    row,
                    e
                );
                AttributeMap::new()
            }),
            None => AttributeMap::new(),
        };

        let mut entry = CatalogEntry::new(name, url);
        entry.image_url = non_empty(self.image_url);
        entry.description = non_empty(self.bio);
        entry.kind = non_empty(self.kind);
        entry.color = non_empty(self.color);
        entry.squad = non_empty(self.squad);
        entry.sizes = non_empty(self.sizes);
        entry.collector_number = non_empty(self.collector_number);
        entry.year = non_empty(self.year);
        entry.extra = extra;
        Some(entry)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Writes the tabular export
pub fn write_csv(entries: &[CatalogEntry], path: &Path) -> StorageResult<()> {
    let csv_err = |source| StorageError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS).map_err(csv_err)?;
    for entry in entries {
        let row = CsvRow::from_entry(entry).map_err(|source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        writer.serialize(row).map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| StorageError::io(path, e.into_error()))?;
    write_atomic(path, &bytes)
}

/// Reads a tabular export; a missing file yields no entries
///
/// Rows that fail to parse, or lack a name or URL, are skipped with a warning.
pub fn read_csv(path: &Path) -> StorageResult<Vec<CatalogEntry>> {
    let Some(bytes) = read_if_exists(path)? else {
        return Ok(Vec::new());
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes.as_slice());

    let mut entries = Vec::new();
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        match result {
            Ok(row) => {
                match row.into_entry(path, index + 1) {
                    Some(entry) => entries.push(entry),
                    None => tracing::warn!(
                        "Skipping row without name or URL in {}",
                        path.display()
                    ),
                }
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable row in {}: {}", path.display(), e);
            }
        }
    }
    Ok(entries)
}

/// Writes the document export
pub fn write_json(entries: &[CatalogEntry], path: &Path) -> StorageResult<()> {
    let mut bytes = serde_json::to_vec_pretty(entries).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

/// Reads a document export; a missing file yields no entries
pub fn read_json(path: &Path) -> StorageResult<Vec<CatalogEntry>> {
    let Some(bytes) = read_if_exists(path)? else {
        return Ok(Vec::new());
    };
    serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })
}
