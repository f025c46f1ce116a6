//! Index page parser
//!
//! This module turns the index page into the ordered list of candidate leaf
//! URLs:
//! - Links are taken from the article body (`div.mw-parser-output`), or from
//!   the whole document when the page has no such container
//! - Only `/wiki/...` links in article namespaces are kept
//! - Duplicates are dropped, first occurrence wins
//! - List and index pages (`Master_List`, `By_...`) are filtered out

use crate::url::{is_noisy_page, resolve_wiki_href};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static ARTICLE_BODY: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.mw-parser-output").expect("article body selector is valid")
});

static WIKI_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href^='/wiki/']").expect("wiki link selector is valid")
});

/// Extracts candidate entry URLs from the index page
///
/// # Arguments
///
/// * `html` - Raw bytes of the index page
/// * `base_url` - The wiki base URL used to resolve relative links
///
/// # Returns
///
/// Absolute URLs in document order, without duplicates
///
/// # Example
///
/// ```
/// use url::Url;
/// use wikidex::crawler::extract_index_urls;
///
/// let html = br#"<div class="mw-parser-output">
///     <a href="/wiki/Fifi">Fifi</a>
///     <a href="/wiki/Category:Foxes">Foxes</a>
/// </div>"#;
/// let base = Url::parse("https://example.fandom.com").unwrap();
///
/// assert_eq!(
///     extract_index_urls(html, &base),
///     vec!["https://example.fandom.com/wiki/Fifi".to_string()]
/// );
/// ```
pub fn extract_index_urls(html: &[u8], base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(&String::from_utf8_lossy(html));

    let hrefs: Vec<&str> = match document.select(&ARTICLE_BODY).next() {
        Some(body) => body
            .select(&WIKI_LINK)
            .filter_map(|a| a.value().attr("href"))
            .collect(),
        None => document
            .select(&WIKI_LINK)
            .filter_map(|a| a.value().attr("href"))
            .collect(),
    };

    let mut seen = HashSet::new();
    let urls: Vec<String> = hrefs
        .into_iter()
        .filter_map(|href| resolve_wiki_href(href, base_url))
        .filter(|url| seen.insert(url.clone()))
        .filter(|url| !is_noisy_page(url))
        .collect();

    tracing::debug!("Index page lists {} candidate URLs", urls.len());
    urls
}
