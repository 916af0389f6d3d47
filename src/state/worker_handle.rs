//! Coordinator-side record of one fetch worker

use crate::queue::Task;
use crate::CrawlError;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::{JoinError, JoinHandle};

/// Slot holding the task a worker is currently processing
///
/// The worker fills it on dequeue and empties it just before reporting the
/// task done. The coordinator reads it to spot work in flight and to recover
/// the task of a worker that died.
#[derive(Debug, Clone, Default)]
pub struct InFlightSlot {
    task: Arc<Mutex<Option<Task>>>,
}

impl InFlightSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, task: Task) {
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
    }

    pub fn take(&self) -> Option<Task> {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn is_occupied(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// How a worker task ended
#[derive(Debug)]
pub enum WorkerExit {
    /// Returned normally
    Finished,
    /// Returned an error (for example, its fetch backend failed to start)
    Failed(CrawlError),
    /// Panicked
    Panicked(String),
    /// Aborted by the coordinator
    Cancelled,
}

impl WorkerExit {
    pub(crate) fn from_join(result: Result<Result<(), CrawlError>, JoinError>) -> Self {
        match result {
            Ok(Ok(())) => Self::Finished,
            Ok(Err(e)) => Self::Failed(e),
            Err(e) if e.is_cancelled() => Self::Cancelled,
            Err(e) => Self::Panicked(e.to_string()),
        }
    }
}

/// A running worker as seen by the coordinator
///
/// Owned and mutated only by the coordinator.
#[derive(Debug)]
pub struct WorkerHandle {
    /// Stable index; a replacement worker reuses the index of the one it replaces
    pub index: usize,

    /// How many times this index has been restarted
    pub generation: u32,

    pub in_flight: InFlightSlot,

    // None once the exit has been collected
    join: Option<JoinHandle<Result<(), CrawlError>>>,
}

impl WorkerHandle {
    pub fn new(
        index: usize,
        generation: u32,
        in_flight: InFlightSlot,
        join: JoinHandle<Result<(), CrawlError>>,
    ) -> Self {
        Self {
            index,
            generation,
            in_flight,
            join: Some(join),
        }
    }

    /// Returns true while the worker task has not finished
    pub fn is_alive(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Forcibly terminates the worker
    pub fn abort(&self) {
        if let Some(join) = &self.join {
            join.abort();
        }
    }

    /// Waits for the worker to end and reports how it ended
    ///
    /// Safe to cancel. Once an exit has been collected, later calls return
    /// `Finished` immediately.
    pub async fn wait(&mut self) -> WorkerExit {
        let Some(join) = self.join.as_mut() else {
            return WorkerExit::Finished;
        };
        let exit = WorkerExit::from_join(join.await);
        self.join = None;
        exit
    }
}
