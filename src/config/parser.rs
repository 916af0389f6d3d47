//! Reading `shelfwalk.toml`
//!
//! The file is read once; its SHA-256 digest is recorded with every SQLite run
//! so runs made with different settings can be told apart.

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads, parses and validates the config file at `path`
///
/// ```no_run
/// use shelfwalk::config::load_config;
/// use std::path::Path;
///
/// let config = load_config(Path::new("shelfwalk.toml")).unwrap();
/// println!("Workers: {}", config.crawler.workers);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex-encoded SHA-256 of config text
pub fn hash_config(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Hex-encoded SHA-256 of the config file at `path`
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    Ok(hash_config(&std::fs::read_to_string(path)?))
}

/// Loads the config at `path` together with the hash of the exact text parsed
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_config(&content)))
}
