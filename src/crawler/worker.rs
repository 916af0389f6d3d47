//! Fetch worker loop
//!
//! Each worker owns one fetcher, takes listing pages off the shared queue
//! and reports everything it learns over the result channel. Per-page
//! failures are logged and absorbed; only a closed result channel ends a
//! worker with an error.

use crate::crawler::fetcher::{CatalogFetcher, FetcherFactory};
use crate::crawler::parser::ListingPage;
use crate::queue::{ResultMessage, ResultSender, Task, TaskQueue};
use crate::state::InFlightSlot;
use crate::url::resolve_link;
use crate::CrawlError;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything a worker shares with the coordinator
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub index: usize,
    pub tasks: Arc<TaskQueue>,
    pub results: ResultSender,
    pub stop: CancellationToken,
    pub in_flight: InFlightSlot,

    /// Longest single wait on the task queue before the stop signal is re-checked
    pub task_wait: Duration,
}

/// Starts a fetcher and processes tasks until stopped
///
/// Returns once the stop signal is set and the queue has stayed empty for a
/// full `task_wait`.
pub async fn run_worker<B: FetcherFactory>(backend: B, ctx: WorkerContext) -> Result<(), CrawlError> {
    let fetcher = backend.launch(ctx.index).map_err(|e| {
        tracing::error!("Worker {} failed to start: {}", ctx.index, e);
        e
    })?;

    FetchWorker::new(fetcher, ctx).run().await
}

/// A worker with its fetcher already started
pub struct FetchWorker<F> {
    fetcher: F,
    ctx: WorkerContext,
}

impl<F: CatalogFetcher> FetchWorker<F> {
    pub fn new(fetcher: F, ctx: WorkerContext) -> Self {
        Self { fetcher, ctx }
    }

    pub async fn run(self) -> Result<(), CrawlError> {
        let index = self.ctx.index;
        let mut processed = 0u64;
        tracing::info!("Worker {} started", index);

        loop {
            match self.ctx.tasks.pop_timeout(self.ctx.task_wait).await {
                Some(task) => {
                    self.process_task(task).await?;
                    processed += 1;
                }
                None if self.ctx.stop.is_cancelled() => break,
                None => tracing::trace!("Worker {} idle, waiting for tasks", index),
            }
        }

        tracing::info!("Worker {} stopped after {} pages", index, processed);
        Ok(())
    }

    /// Processes one listing page and reports it done
    ///
    /// Exactly one `TaskDone` is sent per call, whatever happened to the
    /// page and its detail links. A panic while handling the page abandons
    /// that page only.
    pub async fn process_task(&self, task: Task) -> Result<(), CrawlError> {
        tracing::info!("Worker {} processing page: {}", self.ctx.index, task);
        self.ctx.in_flight.set(task.clone());

        match AssertUnwindSafe(self.fetch_page(&task)).catch_unwind().await {
            Ok(result) => result?,
            Err(panic) => tracing::error!(
                "Worker {} panicked on {}: {}",
                self.ctx.index,
                task,
                panic_message(panic.as_ref())
            ),
        }

        self.ctx.in_flight.take();
        self.ctx.results.send(ResultMessage::TaskDone)
    }

    async fn fetch_page(&self, task: &Task) -> Result<(), CrawlError> {
        match self.fetcher.fetch_listing_page(&task.url).await {
            Ok(listing) => self.handle_listing(task, listing).await,
            Err(e) => {
                tracing::warn!("Worker {} failed to fetch {}: {}", self.ctx.index, task, e);
                Ok(())
            }
        }
    }

    async fn handle_listing(&self, task: &Task, listing: ListingPage) -> Result<(), CrawlError> {
        let ListingPage {
            detail_links,
            next_page,
        } = listing;

        tracing::debug!(
            "Worker {} found {} detail links on {}",
            self.ctx.index,
            detail_links.len(),
            task
        );

        for href in &detail_links {
            let url = match resolve_link(&task.url, href) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping detail link '{}' on {}: {}", href, task, e);
                    continue;
                }
            };

            match self.fetcher.fetch_detail_record(&url).await {
                Ok(record) => {
                    tracing::debug!("Worker {} scraped: {}", self.ctx.index, record.title);
                    self.ctx.results.send(ResultMessage::DetailRecord(record))?;
                }
                Err(e) => {
                    tracing::warn!("Worker {} failed to scrape {}: {}", self.ctx.index, url, e)
                }
            }
        }

        if let Some(href) = next_page {
            match resolve_link(&task.url, &href) {
                Ok(url) => {
                    tracing::debug!("Worker {} discovered next page: {}", self.ctx.index, url);
                    self.ctx.results.send(ResultMessage::NewTask { url })?;
                }
                Err(e) => tracing::warn!("Skipping next-page link '{}' on {}: {}", href, task, e),
            }
        }

        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
