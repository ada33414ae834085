//! HTML link extraction
//!
//! Finds the links a page points at (`<a>` tags and canonical links) and
//! resolves them against the page URL.

use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// All links found on the page (absolute URLs, in document order)
    pub links: Vec<String>,
}

/// Parses HTML content and extracts its links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags in body, nav, header, footer
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<link rel="stylesheet" ...>`
/// - `<script src="...">`
/// - `<img src="...">`
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
///
/// `rel="nofollow"` links are followed.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Returns
///
/// * `Ok(ParsedPage)` - Successfully parsed page
/// * `Err(String)` - Failed to parse HTML
///
/// # Example
///
/// ```
/// use depth_crawler::downloader::parse_html;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url).unwrap();
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> Result<ParsedPage, String> {
    let document = Html::parse_document(html);
    let links = extract_links(&document, base_url)?;
    Ok(ParsedPage { links })
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Result<Vec<String>, String> {
    let selector = |css: &'static str| {
        Selector::parse(css).map_err(|e| format!("bad selector {}: {:?}", css, e))
    };
    let anchors = selector("a[href]")?;
    let canonical = selector("link[rel='canonical'][href]")?;

    let anchor_hrefs = document
        .select(&anchors)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"));
    let canonical_hrefs = document
        .select(&canonical)
        .filter_map(|element| element.value().attr("href"));

    Ok(anchor_hrefs
        .chain(canonical_hrefs)
        .filter_map(|href| resolve_link(href, base_url))
        .collect())
}

/// Schemes that never lead to a fetchable page
const IGNORED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Resolves an href against the page URL
///
/// Returns None for empty and fragment-only hrefs, ignored schemes, hrefs
/// that fail to resolve, and anything that is not http(s) after resolution.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if IGNORED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    matches!(absolute_url.scheme(), "http" | "https").then(|| absolute_url.to_string())
}
