//! Crawling: fetch workers, their backends and the coordinator that runs them
//!
//! - `fetcher`: the per-worker fetch backend traits and the HTTP backend
//! - `parser`: CSS-selector extraction for listing and detail pages
//! - `worker`: the worker loop
//! - `coordinator`: pool supervision, result draining and stop detection

mod coordinator;
mod fetcher;
mod parser;
mod worker;

pub use coordinator::{Coordinator, CoordinatorSettings, RunReport, StopReason};
pub use fetcher::{build_http_client, CatalogFetcher, FetcherFactory, HttpFetcher, HttpFetcherFactory};
pub use parser::{parse_detail, parse_listing, ListingPage, Selectors};
pub use worker::{run_worker, FetchWorker, WorkerContext};

use crate::config::Config;
use crate::sink::open_sinks;
use crate::CrawlError;
use std::sync::Arc;
use url::Url;

/// Runs a complete crawl as described by `config`
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Compile the page selectors and prepare the HTTP backend
/// 2. Open the configured record sinks
/// 3. Stop the crawl on Ctrl-C
/// 4. Crawl from the start page until quiescent
///
/// # Arguments
///
/// * `config` - The validated crawler configuration
/// * `config_hash` - Hash of the config file, recorded with the run
pub async fn run_crawl(config: Config, config_hash: &str) -> Result<RunReport, CrawlError> {
    let start_url = Url::parse(&config.crawler.start_url)?;
    let selectors = Arc::new(Selectors::compile(&config.selectors)?);
    let backend = HttpFetcherFactory::new(config.fetch.clone(), selectors);
    let sinks = open_sinks(&config.output, config_hash)?;

    let mut coordinator =
        Coordinator::new(CoordinatorSettings::from(&config.crawler), backend, sinks);

    let stop = coordinator.stop_signal();
    let interrupt = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, stopping crawl");
                stop.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for interrupt: {}", e),
        }
    });

    let report = coordinator.run(start_url).await;
    interrupt.abort();
    report
}
