//! Configuration module for Forum-Scraper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use forum_scraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("forum.toml")).unwrap();
//! println!("Crawling {}", config.forum.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ForumConfig, OutputConfig, SelectorConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
