use crate::url::matcher::is_skipped_namespace;
use url::Url;

const WIKI_PREFIX: &str = "/wiki/";

/// Resolves an index-page href to an absolute article URL
///
/// # Resolution Steps
///
/// 1. Trim the href and drop any fragment (`#section`)
/// 2. Keep only site-relative `/wiki/...` links
/// 3. Drop non-article namespaces (`File:`, `Category:`, ...)
/// 4. Join against the wiki base URL
///
/// # Arguments
///
/// * `href` - The raw `href` attribute value
/// * `base` - The wiki base URL
///
/// # Returns
///
/// The absolute URL, or `None` if the link is not a candidate entry
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wikidex::url::resolve_wiki_href;
///
/// let base = Url::parse("https://example.fandom.com").unwrap();
/// assert_eq!(
///     resolve_wiki_href("/wiki/Fifi#Bio", &base).as_deref(),
///     Some("https://example.fandom.com/wiki/Fifi")
/// );
/// assert_eq!(resolve_wiki_href("/wiki/File:Fifi.png", &base), None);
/// ```
pub fn resolve_wiki_href(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    let href = href.split('#').next().unwrap_or_default();

    let title = href.strip_prefix(WIKI_PREFIX)?;
    if title.is_empty() || is_skipped_namespace(title) {
        return None;
    }

    base.join(href).ok().map(|url| url.to_string())
}

/// Last path segment of a URL, used to keep log lines short
pub fn page_slug(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}
