//! Shelfwalk: a catalog crawler with a self-extending work queue
//!
//! This crate crawls a paginated catalog whose length is not known up front.
//! A fixed pool of fetch workers consumes listing pages, emits detail records,
//! and feeds newly discovered listing pages back to a coordinator, which
//! supervises the pool and decides when the crawl has gone quiet.

pub mod config;
pub mod crawler;
pub mod output;
pub mod queue;
pub mod sink;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Shelfwalk operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Unexpected content type for {url}: {content_type}")]
    ContentMismatch { url: String, content_type: String },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Worker {index} failed to initialize: {message}")]
    WorkerInit { index: usize, message: String },

    #[error("Result channel closed")]
    ChannelClosed,

    #[error("Sink error: {0}")]
    Sink(#[from] sink::SinkError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Shelfwalk operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator, CoordinatorSettings, RunReport, StopReason};
pub use queue::{DetailRecord, ResultMessage, Task, TaskQueue};
pub use sink::{RecordSink, RunStatus, SinkError};
pub use state::{CoordinatorState, ProgressCounters};
pub use crate::url::resolve_link;
