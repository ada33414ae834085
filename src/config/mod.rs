//! Configuration module for Depth-Crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; missing values fall back to defaults sized for the
//! current machine.
//!
//! # Example
//!
//! ```no_run
//! use depth_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Fetch workers: {}", config.engine.fetch_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlDefaults, EngineConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use validation::{validate, validate_engine_config};
