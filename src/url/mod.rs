//! URL handling module for Wikidex
//!
//! This module provides the URL digest used for cache keys and entry
//! identifiers, wiki link resolution, and the path/title filters that tell
//! entries apart from list pages.

mod matcher;
mod normalize;

use sha2::{Digest, Sha256};

// Re-export main functions
pub use matcher::{is_noisy_page, is_non_entry_title, is_skipped_namespace, SKIP_NAMESPACES};
pub use normalize::{page_slug, resolve_wiki_href};

/// Hex-encoded SHA-256 digest of a URL string
///
/// The digest is computed over the exact string, so it is a pure function of
/// the URL and safe to use as a filename regardless of length or characters.
///
/// # Examples
///
/// ```
/// use wikidex::url::url_digest;
///
/// let a = url_digest("https://example.com/wiki/Fifi");
/// assert_eq!(a, url_digest("https://example.com/wiki/Fifi"));
/// assert_eq!(a.len(), 64);
/// ```
pub fn url_digest(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
