//! Page classifier and extractor
//!
//! Turns the raw bytes of a leaf page into an [`ExtractedPage`]:
//! - display name (first `h1`, else `og:title` without the site suffix)
//! - primary image (`og:image`)
//! - infobox key/value pairs, see [`infobox`]
//! - a bounded description from the "Bio" section, see [`section`]
//!
//! Whether the page is a catalog entry is decided by [`classify`], which only
//! looks at the name and the normalized attribute map.

pub mod classify;
pub mod infobox;
pub mod section;

pub use classify::{classify, Classification, RejectReason};

use crate::catalog::{AttributeMap, CatalogEntry};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Heading that introduces the description section
pub const DESCRIPTION_HEADING: &str = "Bio";

/// Maximum description length, in characters
pub const DESCRIPTION_BUDGET: usize = 2500;

static H1: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("h1 selector is valid"));

static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[property='og:title']").expect("og:title selector is valid")
});

static OG_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[property='og:image']").expect("og:image selector is valid")
});

/// Everything pulled out of one leaf page, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub name: Option<String>,
    pub source_url: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub attributes: AttributeMap,
}

impl ExtractedPage {
    /// Classifies the page against its name and attributes
    pub fn classification(&self) -> Classification {
        classify(self.name.as_deref(), &self.attributes)
    }

    /// Converts the page into a catalog entry, or says why it is not one
    ///
    /// A nameless entry can never be produced here.
    pub fn into_entry(self) -> Result<CatalogEntry, RejectReason> {
        if let Classification::Rejected(reason) = self.classification() {
            return Err(reason);
        }
        let name = self.name.ok_or(RejectReason::MissingName)?;

        let mut entry = CatalogEntry::from_attributes(name, self.source_url, &self.attributes);
        entry.image_url = self.image_url;
        entry.description = self.description;
        Ok(entry)
    }
}

/// Parses a leaf page
///
/// # Arguments
///
/// * `html` - Raw response bytes; invalid UTF-8 is replaced, never rejected
/// * `source_url` - The URL the bytes were fetched from
pub fn extract_page(html: &[u8], source_url: &str) -> ExtractedPage {
    let document = Html::parse_document(&String::from_utf8_lossy(html));

    ExtractedPage {
        name: extract_name(&document),
        source_url: source_url.to_string(),
        image_url: meta_content(&document, &OG_IMAGE),
        description: section::section_text(&document, DESCRIPTION_HEADING, DESCRIPTION_BUDGET),
        attributes: infobox::parse_infobox(&document),
    }
}

fn extract_name(document: &Html) -> Option<String> {
    let heading = document
        .select(&H1)
        .next()
        .map(|h1| joined_text(h1))
        .filter(|name| !name.is_empty());

    heading.or_else(|| {
        meta_content(document, &OG_TITLE)
            .and_then(|title| title.split('|').next().map(|s| s.trim().to_string()))
            .filter(|name| !name.is_empty())
    })
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::to_string)
        .filter(|content| !content.is_empty())
}

/// Text of an element's descendants, each piece trimmed, joined by one space
pub(crate) fn joined_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
