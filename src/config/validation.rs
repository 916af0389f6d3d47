use crate::config::types::{Config, CrawlerConfig, FetchConfig, OutputConfig, SelectorConfig};
use crate::crawler::Selectors;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_selectors(&config.selectors)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates worker pool and timing configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "start-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.idle_threshold < 1 {
        return Err(ConfigError::Validation(
            "idle-threshold must be >= 1".to_string(),
        ));
    }

    if config.expected_pages == Some(0) {
        return Err(ConfigError::Validation(
            "expected-pages must be >= 1 when set".to_string(),
        ));
    }

    for (name, value) in [
        ("tick-interval-ms", config.tick_interval_ms),
        ("task-wait-ms", config.task_wait_ms),
        ("result-wait-ms", config.result_wait_ms),
        ("grace-period-ms", config.grace_period_ms),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    if config.drain_burst < 1 {
        return Err(ConfigError::Validation(
            "drain-burst must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request and connect timeouts must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Checks that every selector compiles
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    Selectors::compile(config).map(|_| ())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let records = config.records_path.as_deref().map(str::trim);
    let database = config.database_path.as_deref().map(str::trim);

    if records == Some("") || database == Some("") {
        return Err(ConfigError::Validation(
            "output paths cannot be empty".to_string(),
        ));
    }

    if records.is_none() && database.is_none() {
        return Err(ConfigError::Validation(
            "at least one of records-path or database-path must be set".to_string(),
        ));
    }

    Ok(())
}
