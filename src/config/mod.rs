//! Configuration module for Roster-Crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has defaults, so a missing key (or a missing file, see
//! [`Config::default`]) falls back to the values the crawler was tuned with.
//!
//! # Example
//!
//! ```no_run
//! use roster_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("roster.toml")).unwrap();
//! println!("Crawler will visit at most {} pages", config.pagination.max_pages);
//! ```

mod parser;
mod types;
pub(crate) mod validation;

// Re-export types
pub use types::{
    Config, ExtractConfig, FetchConfig, OutputConfig, PaginationConfig, SiteConfig,
    DEFAULT_USER_AGENTS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
