//! Entry classification
//!
//! A pure decision over the display name and the normalized attribute map. It
//! never sees markup, so the HTML layer can change without touching it.

use crate::catalog::{AttributeMap, ELEVATED_KEYS};
use crate::url::is_non_entry_title;
use std::fmt;

/// Why a fetched page was not accepted as an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingName,
    DenylistedTitle,
    EmptyInfobox,
    NoKnownKeys,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::MissingName => "no name",
            Self::DenylistedTitle => "list page title",
            Self::EmptyInfobox => "no infobox",
            Self::NoKnownKeys => "no entry attributes",
        };
        f.write_str(reason)
    }
}

/// Outcome of classifying a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Entry,
    Rejected(RejectReason),
}

impl Classification {
    pub fn is_entry(&self) -> bool {
        matches!(self, Self::Entry)
    }
}

/// Decides whether a page is a catalog entry
///
/// Checks run in order: the name must be present and not a known list-page
/// title, the attribute map must be non-empty, and it must hold at least one
/// of [`ELEVATED_KEYS`].
///
/// # Examples
///
/// ```
/// use wikidex::catalog::AttributeMap;
/// use wikidex::extract::{classify, Classification, RejectReason};
///
/// let mut attrs = AttributeMap::new();
/// attrs.insert("Type".to_string(), "Fox".to_string());
///
/// assert_eq!(classify(Some("Fifi"), &attrs), Classification::Entry);
/// assert_eq!(
///     classify(Some("Master List"), &attrs),
///     Classification::Rejected(RejectReason::DenylistedTitle)
/// );
/// ```
pub fn classify(name: Option<&str>, attributes: &AttributeMap) -> Classification {
    let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
        return Classification::Rejected(RejectReason::MissingName);
    };
    if is_non_entry_title(name) {
        return Classification::Rejected(RejectReason::DenylistedTitle);
    }
    if attributes.is_empty() {
        return Classification::Rejected(RejectReason::EmptyInfobox);
    }
    if !ELEVATED_KEYS.iter().any(|key| attributes.contains_key(*key)) {
        return Classification::Rejected(RejectReason::NoKnownKeys);
    }
    Classification::Entry
}
