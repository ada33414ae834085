use crate::UrlError;
use url::Url;

/// Extracts the admission key (lowercase host) from a URL string
///
/// The port is not part of the key: two services on one machine share the
/// same host budget.
///
/// # Examples
///
/// ```
/// use depth_crawler::url::host_of;
///
/// assert_eq!(host_of("https://EXAMPLE.com/path").unwrap(), "example.com");
/// assert_eq!(host_of("https://sub.example.com:8080/").unwrap(), "sub.example.com");
/// assert!(host_of("not a url").is_err());
/// ```
pub fn host_of(url: &str) -> Result<String, UrlError> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingHost)
}
