//! URL handling module for Depth-Crawler
//!
//! This module provides host extraction (the key used for per-host admission),
//! link canonicalisation, and the substring exclusion filter.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::host_of;
pub use matcher::ExcludeFilter;
pub use normalize::normalize_url;
