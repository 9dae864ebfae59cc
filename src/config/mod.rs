//! Configuration module for Library Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional, so a run without a config file uses [`Config::default`].
//!
//! # Example
//!
//! ```no_run
//! use library_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Backoff: {}s", config.retry.backoff_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, HttpConfig, OutputConfig, RetryConfig, RunConfig, SiteConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
