//! Pattern checks for wiki paths and page titles
//!
//! Used both when enumerating the index page (skip list/index pages) and when
//! classifying a fetched page (reject known non-entry titles).

use regex::Regex;
use std::sync::LazyLock;

/// Wiki namespaces that never hold catalog entries
pub const SKIP_NAMESPACES: &[&str] = &[
    "File:",
    "Category:",
    "Special:",
    "Help:",
    "User:",
    "Template:",
    "Talk:",
];

static NOISY_PAGES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/wiki/(Master_List|Main_Page|All_Pages|Animals|Foods|Mythical_Creatures|By_.*)$")
        .expect("noisy page regex is valid")
});

static NON_ENTRY_TITLES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(Master List|Main Page|All Pages|Squishville|Roblox)\b")
        .expect("non-entry title regex is valid")
});

/// Returns true if a page title (the part after `/wiki/`) is in a skipped namespace
///
/// # Examples
///
/// ```
/// use wikidex::url::is_skipped_namespace;
///
/// assert!(is_skipped_namespace("File:Image.png"));
/// assert!(is_skipped_namespace("Category:Animals"));
/// assert!(!is_skipped_namespace("Fifi_the_Fox"));
/// ```
pub fn is_skipped_namespace(title: &str) -> bool {
    SKIP_NAMESPACES.iter().any(|ns| title.starts_with(ns))
}

/// Returns true if the URL points at a list/index page rather than an entry
pub fn is_noisy_page(url: &str) -> bool {
    NOISY_PAGES.is_match(url)
}

/// Returns true if a display name belongs to a known non-entry page
pub fn is_non_entry_title(name: &str) -> bool {
    NON_ENTRY_TITLES.is_match(name)
}
