use crate::url::url_digest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized infobox key/value pairs
pub type AttributeMap = BTreeMap<String, String>;

/// Infobox keys elevated into named fields, in column order
///
/// A page must carry at least one of these to count as an entry.
pub const ELEVATED_KEYS: [&str; 6] = [
    "Type",
    "Color",
    "Squad",
    "Size(s)",
    "Collector Number",
    "Year",
];

/// One catalog item extracted from a leaf page
///
/// `id` is always `identifier(&url)`; constructors enforce it and the CSV
/// reader recomputes it rather than trusting a stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub url: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub color: Option<String>,
    pub squad: Option<String>,
    pub sizes: Option<String>,
    pub collector_number: Option<String>,
    pub year: Option<String>,
    #[serde(default)]
    pub extra: AttributeMap,
}

/// Stable identifier for the entry sourced from `url`
pub fn identifier(url: &str) -> String {
    url_digest(url)
}

impl CatalogEntry {
    /// Creates an entry with no attributes
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: identifier(&url),
            name: name.into(),
            url,
            image_url: None,
            description: None,
            kind: None,
            color: None,
            squad: None,
            sizes: None,
            collector_number: None,
            year: None,
            extra: AttributeMap::new(),
        }
    }

    /// Creates an entry, elevating allow-listed keys and keeping the rest as extras
    pub fn from_attributes(
        name: impl Into<String>,
        url: impl Into<String>,
        attributes: &AttributeMap,
    ) -> Self {
        let mut entry = Self::new(name, url);
        for (key, value) in attributes {
            if let Some(slot) = entry.elevated_slot(key) {
                *slot = Some(value.clone());
            } else {
                entry.extra.insert(key.clone(), value.clone());
            }
        }
        entry
    }

    /// Value of an elevated key, or an extra attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.elevated(key)
            .or_else(|| self.extra.get(key).map(String::as_str))
    }

    fn elevated(&self, key: &str) -> Option<&str> {
        let value = match key {
            "Type" => &self.kind,
            "Color" => &self.color,
            "Squad" => &self.squad,
            "Size(s)" => &self.sizes,
            "Collector Number" => &self.collector_number,
            "Year" => &self.year,
            _ => return None,
        };
        value.as_deref()
    }

    fn elevated_slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "Type" => Some(&mut self.kind),
            "Color" => Some(&mut self.color),
            "Squad" => Some(&mut self.squad),
            "Size(s)" => Some(&mut self.sizes),
            "Collector Number" => Some(&mut self.collector_number),
            "Year" => Some(&mut self.year),
            _ => None,
        }
    }
}
