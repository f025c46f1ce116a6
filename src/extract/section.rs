//! Section text extraction
//!
//! MediaWiki headings look like `<h2><span class="mw-headline">Bio</span></h2>`
//! and the section body is the run of sibling elements that follows, up to
//! the next such heading.

use crate::extract::joined_text;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static HEADLINE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("span.mw-headline").expect("headline selector is valid")
});

const HEADING_TAGS: [&str; 3] = ["h2", "h3", "h4"];
const BLOCK_TAGS: [&str; 5] = ["p", "blockquote", "ul", "ol", "div"];

/// Returns the text of the section titled `heading`, at most `budget` chars
///
/// Only the first matching heading is used. Block-level siblings are collected
/// until the next headline heading or until the budget is exceeded; the joined
/// text is then cut to `budget` characters. Returns `None` if the heading is
/// missing or the section has no text.
pub fn section_text(document: &Html, heading: &str, budget: usize) -> Option<String> {
    let headline = document
        .select(&HEADLINE)
        .find(|span| joined_text(*span) == heading)?;
    let heading_el = headline.parent().and_then(ElementRef::wrap)?;

    let mut parts: Vec<String> = Vec::new();
    let mut collected = 0;

    for sibling in heading_el.next_siblings().filter_map(ElementRef::wrap) {
        let tag = sibling.value().name();

        if HEADING_TAGS.contains(&tag) && sibling.select(&HEADLINE).next().is_some() {
            break;
        }
        if BLOCK_TAGS.contains(&tag) {
            let text = joined_text(sibling);
            if !text.is_empty() {
                collected += text.chars().count();
                parts.push(text);
            }
        }
        if collected > budget {
            break;
        }
    }

    let text = truncate_chars(parts.join(" ").trim(), budget);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Cuts `text` to at most `max` characters, on a char boundary
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].trim_end().to_string(),
        None => text.to_string(),
    }
}
