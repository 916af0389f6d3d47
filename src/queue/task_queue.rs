//! Unbounded FIFO of listing pages to fetch
//!
//! Pushing never blocks. Consumers wait on a `Notify` with a deadline so a
//! worker can periodically look at the stop signal while idle.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use url::Url;

/// How long the fallback emptiness probe waits for an item
const PROBE_WAIT: Duration = Duration::from_millis(10);

/// A single listing page to fetch
///
/// Tasks have no identity beyond their URL; the same page may be queued more
/// than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub url: Url,
    /// Times this task was put back after its worker died
    pub redeliveries: u32,
}

impl Task {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            redeliveries: 0,
        }
    }

    /// The same page, queued again after a crash
    pub fn redelivered(self) -> Self {
        Self {
            redeliveries: self.redeliveries + 1,
            ..self
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Multi-producer, multi-consumer task queue
#[derive(Debug, Default)]
pub struct TaskQueue {
    items: Mutex<VecDeque<Task>>,
    available: Notify,
}

impl TaskQueue {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    // A VecDeque is never left half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a task and wakes one waiting consumer
    pub fn push(&self, task: Task) {
        self.lock().push_back(task);
        self.available.notify_one();
    }

    /// Puts a task back at the head of the queue
    fn push_front(&self, task: Task) {
        self.lock().push_front(task);
        self.available.notify_one();
    }

    /// Takes the oldest task without waiting
    pub fn try_pop(&self) -> Option<Task> {
        self.lock().pop_front()
    }

    /// Takes the oldest task, waiting at most `timeout` for one to arrive
    ///
    /// Returns `None` if the queue stayed empty for the whole wait.
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<Task> {
        let deadline = Instant::now() + timeout;

        loop {
            // Register interest before looking so a push between the check
            // and the wait is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(task) = self.try_pop() {
                return Some(task);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_pop();
            }
        }
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no task is queued
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Best-effort emptiness check that never blocks on the lock
    ///
    /// When the lock is free the answer is exact. When a consumer holds it,
    /// the probe falls back to a short timed pop and puts any task it got
    /// back at the head of the queue.
    pub async fn probe_empty(&self) -> bool {
        match self.items.try_lock() {
            Ok(items) => return items.is_empty(),
            Err(TryLockError::Poisoned(poisoned)) => return poisoned.into_inner().is_empty(),
            Err(TryLockError::WouldBlock) => {}
        }

        match self.pop_timeout(PROBE_WAIT).await {
            Some(task) => {
                self.push_front(task);
                false
            }
            None => true,
        }
    }
}
