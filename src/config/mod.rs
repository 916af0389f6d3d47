//! Configuration module for Shelfwalk
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use shelfwalk::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("shelfwalk.toml")).unwrap();
//! println!("Crawling from {}", config.crawler.start_url);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, CrawlerConfig, FetchConfig, OutputConfig, SelectorConfig};

pub use parser::{compute_config_hash, hash_config, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
