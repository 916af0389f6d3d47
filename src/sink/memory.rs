use crate::queue::DetailRecord;
use crate::sink::{RecordSink, RunStatus, SinkResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<DetailRecord>,
    store_calls: usize,
    closed_with: Option<RunStatus>,
}

/// In-memory sink; clones share the same storage
///
/// Handy for embedding the crawler in other programs and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of every record stored so far
    pub fn records(&self) -> Vec<DetailRecord> {
        self.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Number of times `store` was called
    pub fn store_calls(&self) -> usize {
        self.lock().store_calls
    }

    /// Status passed to `close`, if the sink was closed
    pub fn closed_with(&self) -> Option<RunStatus> {
        self.lock().closed_with
    }
}

impl RecordSink for MemorySink {
    fn store(&mut self, record: &DetailRecord) -> SinkResult<()> {
        let mut inner = self.lock();
        inner.store_calls += 1;
        inner.records.push(record.clone());
        Ok(())
    }

    fn close(&mut self, status: RunStatus) -> SinkResult<()> {
        self.lock().closed_with = Some(status);
        Ok(())
    }
}
