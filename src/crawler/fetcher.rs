//! Fetch backends used by workers
//!
//! A worker asks its [`FetcherFactory`] for a [`CatalogFetcher`] when it
//! starts; a factory error means the worker failed to initialize. The HTTP
//! backend builds one `reqwest` client per worker.

use crate::config::FetchConfig;
use crate::crawler::parser::{parse_detail, parse_listing, ListingPage, Selectors};
use crate::queue::DetailRecord;
use crate::CrawlError;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Per-worker access to the catalog
pub trait CatalogFetcher: Send + Sync {
    /// Fetches a listing page and extracts its links
    fn fetch_listing_page(
        &self,
        url: &Url,
    ) -> impl Future<Output = Result<ListingPage, CrawlError>> + Send;

    /// Fetches a detail page and extracts its record
    fn fetch_detail_record(
        &self,
        url: &Url,
    ) -> impl Future<Output = Result<DetailRecord, CrawlError>> + Send;
}

/// Starts a fetcher for each worker, including restarted ones
pub trait FetcherFactory: Send + Sync + Clone + 'static {
    type Fetcher: CatalogFetcher + 'static;

    fn launch(&self, worker_index: usize) -> Result<Self::Fetcher, CrawlError>;
}

/// Builds an HTTP client with the configured user agent and timeouts
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Factory for [`HttpFetcher`]s
#[derive(Debug, Clone)]
pub struct HttpFetcherFactory {
    config: FetchConfig,
    selectors: Arc<Selectors>,
}

impl HttpFetcherFactory {
    pub fn new(config: FetchConfig, selectors: Arc<Selectors>) -> Self {
        Self { config, selectors }
    }
}

impl FetcherFactory for HttpFetcherFactory {
    type Fetcher = HttpFetcher;

    fn launch(&self, worker_index: usize) -> Result<HttpFetcher, CrawlError> {
        let client = build_http_client(&self.config).map_err(|e| CrawlError::WorkerInit {
            index: worker_index,
            message: e.to_string(),
        })?;

        tracing::debug!("Worker {} built HTTP client", worker_index);

        Ok(HttpFetcher {
            client,
            selectors: Arc::clone(&self.selectors),
        })
    }
}

/// Fetches catalog pages over HTTP and parses them with CSS selectors
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    selectors: Arc<Selectors>,
}

impl HttpFetcher {
    /// GETs `url` and returns the body of a successful HTML response
    ///
    /// # Errors
    ///
    /// | Condition | Error |
    /// |-----------|-------|
    /// | Request timed out | `Timeout` |
    /// | Connection or body failure | `Http` |
    /// | Non-2xx status | `Status` |
    /// | Content-Type present and not HTML | `ContentMismatch` |
    pub async fn fetch_html(&self, url: &Url) -> Result<String, CrawlError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(url, status));
        }

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !content_type.contains("html") {
                return Err(CrawlError::ContentMismatch {
                    url: url.to_string(),
                    content_type: content_type.to_string(),
                });
            }
        }

        response.text().await.map_err(|e| classify_error(url, e))
    }
}

impl CatalogFetcher for HttpFetcher {
    async fn fetch_listing_page(&self, url: &Url) -> Result<ListingPage, CrawlError> {
        let body = self.fetch_html(url).await?;
        Ok(parse_listing(&body, &self.selectors))
    }

    async fn fetch_detail_record(&self, url: &Url) -> Result<DetailRecord, CrawlError> {
        let body = self.fetch_html(url).await?;
        Ok(parse_detail(&body, url, &self.selectors))
    }
}

fn classify_error(url: &Url, error: reqwest::Error) -> CrawlError {
    if error.is_timeout() {
        CrawlError::Timeout {
            url: url.to_string(),
        }
    } else {
        CrawlError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

fn status_error(url: &Url, status: StatusCode) -> CrawlError {
    CrawlError::Status {
        url: url.to_string(),
        status: status.as_u16(),
    }
}
