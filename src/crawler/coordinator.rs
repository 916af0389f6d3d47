//! Crawl coordinator
//!
//! The coordinator seeds the task queue, keeps a fixed pool of workers alive,
//! drains their results into the record sink and decides when the crawl has
//! gone quiet. Each monitoring tick runs four steps in order:
//!
//! 1. Restart any worker that died while the crawl was still running
//! 2. Drain a burst of result messages
//! 3. Feed the tick to the quiescence detector
//! 4. Sleep until the next tick (or until the stop signal is raised)
//!
//! Once stopped, workers get a grace period to finish their current page
//! before they are aborted, and whatever they sent meanwhile is drained.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::FetcherFactory;
use crate::crawler::worker::{run_worker, WorkerContext};
use crate::queue::{result_channel, ResultMessage, ResultReceiver, ResultSender, Task, TaskQueue};
use crate::sink::{RecordSink, RunStatus};
use crate::state::{
    CoordinatorState, InFlightSlot, ProgressCounters, QuiescenceDetector, TickObservation,
    TickVerdict, WorkerExit, WorkerHandle,
};
use crate::{CrawlError, UrlError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Worker pool size and monitoring cadence
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub workers: usize,
    pub idle_threshold: u32,
    pub expected_pages: Option<u64>,
    pub max_shortfall_extensions: u32,
    pub tick_interval: Duration,
    pub task_wait: Duration,
    pub result_wait: Duration,
    pub drain_burst: usize,
    pub grace_period: Duration,
    pub redeliver_on_crash: bool,
    pub max_redeliveries: u32,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            workers: 3,
            idle_threshold: 15,
            expected_pages: None,
            max_shortfall_extensions: 10,
            tick_interval: Duration::from_secs(1),
            task_wait: Duration::from_secs(5),
            result_wait: Duration::from_millis(100),
            drain_burst: 256,
            grace_period: Duration::from_secs(5),
            redeliver_on_crash: true,
            max_redeliveries: 3,
        }
    }
}

impl From<&CrawlerConfig> for CoordinatorSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            workers: config.workers,
            idle_threshold: config.idle_threshold,
            expected_pages: config.expected_pages,
            max_shortfall_extensions: config.max_shortfall_extensions,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            task_wait: Duration::from_millis(config.task_wait_ms),
            result_wait: Duration::from_millis(config.result_wait_ms),
            drain_burst: config.drain_burst,
            grace_period: Duration::from_millis(config.grace_period_ms),
            redeliver_on_crash: config.redeliver_on_crash,
            max_redeliveries: config.max_redeliveries,
        }
    }
}

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Nothing happened for the configured number of ticks
    Quiescent,

    /// Went quiet short of the expected page count and ran out of extensions
    ShortfallCeiling { pages_short: u64 },

    /// The stop signal was raised from outside (operator interrupt)
    Interrupted,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiescent => "quiescent",
            Self::ShortfallCeiling { .. } => "shortfall-ceiling",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Summary of a finished crawl
#[derive(Debug, Clone)]
pub struct RunReport {
    pub counters: ProgressCounters,
    pub state: CoordinatorState,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

impl RunReport {
    /// Status recorded for the run in the record sink
    pub fn run_status(&self) -> RunStatus {
        match self.stop_reason {
            StopReason::Interrupted => RunStatus::Interrupted,
            StopReason::Quiescent | StopReason::ShortfallCeiling { .. } => RunStatus::Completed,
        }
    }
}

/// Supervises the worker pool for one crawl
pub struct Coordinator<B: FetcherFactory, S: RecordSink> {
    settings: CoordinatorSettings,
    backend: B,
    sink: S,
    tasks: Arc<TaskQueue>,
    results_tx: ResultSender,
    results_rx: ResultReceiver,
    stop: CancellationToken,
    workers: Vec<WorkerHandle>,
    counters: ProgressCounters,
    detector: QuiescenceDetector,
    state: CoordinatorState,
    stop_reason: Option<StopReason>,
}

impl<B: FetcherFactory, S: RecordSink> Coordinator<B, S> {
    pub fn new(settings: CoordinatorSettings, backend: B, sink: S) -> Self {
        let (results_tx, results_rx) = result_channel();
        let detector = QuiescenceDetector::new(
            settings.idle_threshold,
            settings.expected_pages,
            settings.max_shortfall_extensions,
        );

        Self {
            settings,
            backend,
            sink,
            tasks: Arc::new(TaskQueue::new()),
            results_tx,
            results_rx,
            stop: CancellationToken::new(),
            workers: Vec::new(),
            counters: ProgressCounters::default(),
            detector,
            state: CoordinatorState::Seeding,
            stop_reason: None,
        }
    }

    /// Uses `stop` as the stop signal instead of a private one
    pub fn with_stop_signal(mut self, stop: CancellationToken) -> Self {
        self.stop = stop;
        self
    }

    /// The stop signal; cancelling it interrupts the crawl
    pub fn stop_signal(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn counters(&self) -> &ProgressCounters {
        &self.counters
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Crawls from `start_url` until quiescent or interrupted
    ///
    /// # Errors
    ///
    /// Fails only if `start_url` is not http(s). Page, record and sink
    /// failures are logged and counted instead.
    pub async fn run(&mut self, start_url: Url) -> Result<RunReport, CrawlError> {
        if start_url.scheme() != "http" && start_url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(start_url.scheme().to_string()).into());
        }

        let start_time = Instant::now();
        self.seed(start_url);

        if self.stop.is_cancelled() {
            tracing::warn!("Stop signal raised before the crawl started");
        } else {
            self.transition(CoordinatorState::Running);
            self.monitor().await;
        }

        let stop_reason = *self.stop_reason.get_or_insert(StopReason::Interrupted);
        self.transition(CoordinatorState::Draining);
        self.shutdown_workers().await;
        self.drain_remaining();

        let report = RunReport {
            counters: self.counters.clone(),
            state: CoordinatorState::Stopped,
            stop_reason,
            elapsed: start_time.elapsed(),
        };

        if let Err(e) = self.sink.close(report.run_status()) {
            tracing::error!("Failed to close record sink: {}", e);
        }

        self.transition(CoordinatorState::Stopped);
        tracing::info!(
            "Processed {} records across {} pages in {:.1}s ({})",
            self.counters.records_processed,
            self.counters.pages_discovered,
            report.elapsed.as_secs_f64(),
            stop_reason.as_str()
        );

        Ok(report)
    }

    /// Moves to `next`; an illegal step is logged and leaves the state unchanged
    fn transition(&mut self, next: CoordinatorState) {
        if !self.state.can_transition_to(next) {
            tracing::error!("Illegal coordinator transition {} -> {}", self.state, next);
            return;
        }
        tracing::debug!("Coordinator {} -> {}", self.state, next);
        self.state = next;
    }

    /// Queues the start page and launches the worker pool
    fn seed(&mut self, start_url: Url) {
        tracing::info!(
            "Seeding crawl at {} with {} workers",
            start_url,
            self.settings.workers
        );

        self.tasks.push(Task::new(start_url));
        self.counters.pages_discovered = 1;

        let workers = (0..self.settings.workers)
            .map(|index| self.spawn_worker(index, 0))
            .collect();
        self.workers = workers;
    }

    fn spawn_worker(&self, index: usize, generation: u32) -> WorkerHandle {
        let in_flight = InFlightSlot::new();
        let ctx = WorkerContext {
            index,
            tasks: Arc::clone(&self.tasks),
            results: self.results_tx.clone(),
            stop: self.stop.clone(),
            in_flight: in_flight.clone(),
            task_wait: self.settings.task_wait,
        };

        let join = tokio::spawn(run_worker(self.backend.clone(), ctx));
        WorkerHandle::new(index, generation, in_flight, join)
    }

    async fn monitor(&mut self) {
        while !self.stop.is_cancelled() {
            self.tick().await;

            if self.stop.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.tick_interval) => {}
                _ = self.stop.cancelled() => {}
            }
        }
    }

    /// Runs one monitoring cycle
    async fn tick(&mut self) {
        self.restart_dead_workers().await;
        let drained = self.drain_results().await;

        let queue_empty = self.tasks.probe_empty().await;
        let in_flight = self
            .workers
            .iter()
            .filter(|worker| worker.in_flight.is_occupied())
            .count();

        let verdict = self.detector.observe(TickObservation {
            pages_discovered: self.counters.pages_discovered,
            records_processed: self.counters.records_processed,
            drained,
            queue_empty,
            in_flight,
        });
        self.counters.idle_ticks = self.detector.idle_ticks();

        match verdict {
            TickVerdict::Busy => {
                tracing::debug!(
                    "Tick: {} messages, {} queued, {} in flight",
                    drained,
                    self.tasks.len(),
                    in_flight
                );
            }
            TickVerdict::Idle { idle_ticks } => {
                tracing::info!(
                    "System idle check {}/{} ({} pages, {} records)",
                    idle_ticks,
                    self.settings.idle_threshold,
                    self.counters.pages_discovered,
                    self.counters.records_processed
                );
            }
            TickVerdict::Extended {
                pages_short,
                extensions,
            } => {
                tracing::warn!(
                    "Quiet but {} pages short of expected; waiting longer ({}/{})",
                    pages_short,
                    extensions,
                    self.settings.max_shortfall_extensions
                );
            }
            TickVerdict::Quiescent => {
                tracing::info!(
                    "No activity for {} ticks, stopping crawl",
                    self.settings.idle_threshold
                );
                self.request_stop(StopReason::Quiescent);
            }
            TickVerdict::ShortfallCeiling { pages_short } => {
                tracing::warn!(
                    "Still {} pages short after {} extensions, stopping crawl",
                    pages_short,
                    self.detector.extensions()
                );
                self.request_stop(StopReason::ShortfallCeiling { pages_short });
            }
        }
    }

    fn request_stop(&mut self, reason: StopReason) {
        self.stop_reason.get_or_insert(reason);
        self.stop.cancel();
    }

    /// Replaces every worker that ended while the crawl was running
    async fn restart_dead_workers(&mut self) {
        for slot in 0..self.workers.len() {
            if self.workers[slot].is_alive() || self.stop.is_cancelled() {
                continue;
            }

            let exit = self.workers[slot].wait().await;
            let index = self.workers[slot].index;
            match &exit {
                WorkerExit::Failed(e) => tracing::error!("Worker {} failed: {}", index, e),
                WorkerExit::Panicked(message) => {
                    tracing::error!("Worker {} panicked: {}", index, message)
                }
                WorkerExit::Finished | WorkerExit::Cancelled => {
                    tracing::warn!("Worker {} exited unexpectedly", index)
                }
            }

            if let Some(task) = self.workers[slot].in_flight.take() {
                self.recover_task(task, index);
            }

            let generation = self.workers[slot].generation + 1;
            let replacement = self.spawn_worker(index, generation);
            self.workers[slot] = replacement;
            self.counters.worker_restarts += 1;
            tracing::info!("Restarted worker {} (generation {})", index, generation);
        }
    }

    /// Puts a crashed worker's task back on the queue, within the redelivery limit
    fn recover_task(&mut self, task: Task, index: usize) {
        if !self.settings.redeliver_on_crash {
            tracing::warn!("Dropping {} held by worker {}", task, index);
            return;
        }

        if task.redeliveries >= self.settings.max_redeliveries {
            tracing::error!(
                "Giving up on {} after {} redeliveries (worker {})",
                task,
                task.redeliveries,
                index
            );
            self.counters.tasks_abandoned += 1;
            return;
        }

        tracing::info!("Requeueing {} from worker {}", task, index);
        self.tasks.push(task.redelivered());
        self.counters.tasks_redelivered += 1;
    }

    /// Handles up to one burst of result messages; returns how many arrived
    async fn drain_results(&mut self) -> usize {
        let mut drained = 0;

        while drained < self.settings.drain_burst {
            let Some(message) = self.results_rx.recv_timeout(self.settings.result_wait).await
            else {
                break;
            };
            drained += 1;
            self.handle_message(message);
        }

        drained
    }

    /// Collects whatever is left in the channel after the workers are gone
    fn drain_remaining(&mut self) {
        let mut drained = 0;
        while let Some(message) = self.results_rx.try_recv() {
            drained += 1;
            self.handle_message(message);
        }

        if drained > 0 {
            tracing::debug!("Drained {} messages after stop", drained);
        }
    }

    fn handle_message(&mut self, message: ResultMessage) {
        match message {
            ResultMessage::NewTask { url } if self.state == CoordinatorState::Running => {
                tracing::info!("Discovered page {}: {}", self.counters.pages_discovered + 1, url);
                self.tasks.push(Task::new(url));
                self.counters.pages_discovered += 1;
            }
            ResultMessage::NewTask { url } => {
                tracing::warn!("Dropping page discovered after stop: {}", url);
                self.counters.late_pages_dropped += 1;
            }
            ResultMessage::DetailRecord(record) => {
                self.counters.records_processed += 1;
                tracing::info!(
                    "Processed record {}: {}",
                    self.counters.records_processed,
                    record.title
                );
                if let Err(e) = self.sink.store(&record) {
                    self.counters.sink_failures += 1;
                    tracing::error!("Failed to store record for {}: {}", record.url, e);
                }
            }
            ResultMessage::TaskDone => {
                self.counters.tasks_completed += 1;
            }
        }
    }

    /// Gives workers the grace period to exit, then aborts the rest
    async fn shutdown_workers(&mut self) {
        let deadline = tokio::time::Instant::now() + self.settings.grace_period;

        for worker in &mut self.workers {
            match tokio::time::timeout_at(deadline, worker.wait()).await {
                Ok(WorkerExit::Failed(e)) => {
                    tracing::warn!("Worker {} ended with error: {}", worker.index, e)
                }
                Ok(WorkerExit::Panicked(message)) => {
                    tracing::warn!("Worker {} panicked: {}", worker.index, message)
                }
                Ok(_) => tracing::debug!("Worker {} joined", worker.index),
                Err(_) => {
                    tracing::warn!("Worker {} did not stop in time, aborting", worker.index);
                    worker.abort();
                    worker.wait().await;
                }
            }
        }
    }
}
