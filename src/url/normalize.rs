use crate::UrlError;
use url::Url;

/// Tracking query parameters dropped during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Canonicalises a discovered link
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not http(s)
/// 2. Remove the fragment
/// 3. Remove tracking query parameters (`utm_*`, `fbclid`, `gclid`, `mc_eid`)
/// 4. Remove an empty query string
///
/// Host lowercasing, default-port removal and dot-segment removal are done
/// by the `url` parser itself.
///
/// # Examples
///
/// ```
/// use depth_crawler::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com/a/../b?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/b");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
