//! Infobox parsing
//!
//! The wiki renders structured data as a "portable infobox": an
//! `aside.portable-infobox` holding `.pi-data` items, each with a
//! `.pi-data-label` and a `.pi-data-value`.

use crate::catalog::AttributeMap;
use crate::extract::joined_text;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

static INFOBOX: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("aside.portable-infobox").expect("infobox selector is valid")
});

static DATA_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".pi-data").expect("pi-data selector is valid"));

static DATA_LABEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".pi-data-label").expect("pi-data-label selector is valid"));

static DATA_VALUE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".pi-data-value").expect("pi-data-value selector is valid"));

static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("link selector is valid"));

/// Extracts the key/value pairs of the first infobox on the page
///
/// Labels have their whitespace collapsed. Values prefer the text of embedded
/// links (deduplicated, in order, joined by `", "`); only values without any
/// non-empty link fall back to the full text. Items missing a label or a value
/// are skipped. A repeated label keeps its last value.
pub fn parse_infobox(document: &Html) -> AttributeMap {
    let mut attributes = AttributeMap::new();

    let Some(infobox) = document.select(&INFOBOX).next() else {
        return attributes;
    };

    for item in infobox.select(&DATA_ITEM) {
        let (Some(label), Some(value)) = (
            item.select(&DATA_LABEL).next(),
            item.select(&DATA_VALUE).next(),
        ) else {
            continue;
        };

        let label = normalize_label(&joined_text(label));
        let value = value_text(value);

        if !label.is_empty() && !value.is_empty() {
            attributes.insert(label, value);
        }
    }

    attributes
}

/// Collapses runs of whitespace in a label to single spaces
pub fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn value_text(value: ElementRef<'_>) -> String {
    let mut seen = HashSet::new();
    let links: Vec<String> = value
        .select(&LINK)
        .map(joined_text)
        .filter(|text| !text.is_empty())
        .filter(|text| seen.insert(text.clone()))
        .collect();

    if links.is_empty() {
        joined_text(value)
    } else {
        links.join(", ")
    }
}
