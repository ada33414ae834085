/// Substring-based URL exclusion
///
/// A URL is excluded when its text contains any of the configured substrings.
/// Empty substrings are dropped on construction, otherwise they would match
/// every URL.
///
/// # Examples
///
/// ```
/// use depth_crawler::url::ExcludeFilter;
///
/// let filter = ExcludeFilter::new(["logout", "/private/"]);
/// assert!(filter.is_excluded("https://example.com/logout?next=/"));
/// assert!(!filter.is_excluded("https://example.com/public/"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    patterns: Vec<String>,
}

impl ExcludeFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// Returns true if the URL contains any excluded substring
    pub fn is_excluded(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| url.contains(p.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
