//! Record sinks: where scraped detail records end up
//!
//! The coordinator hands every `DetailRecord` to a single `RecordSink`.
//! Sinks are append-only; a failed store is logged by the caller and the
//! crawl carries on.

mod memory;
mod schema;
mod sqlite;
mod text;

pub use memory::MemorySink;
pub use sqlite::{RecordDatabase, RunRecord, SqliteSink};
pub use text::TextFileSink;

use crate::config::OutputConfig;
use crate::queue::DetailRecord;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while storing records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Sink already closed")]
    Closed,
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Final status of a crawl run, as recorded by sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Destination for scraped detail records
pub trait RecordSink: Send {
    /// Appends one record
    fn store(&mut self, record: &DetailRecord) -> SinkResult<()>;

    /// Flushes and finalizes the sink at the end of a run
    fn close(&mut self, status: RunStatus) -> SinkResult<()> {
        let _ = status;
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn store(&mut self, record: &DetailRecord) -> SinkResult<()> {
        (**self).store(record)
    }

    fn close(&mut self, status: RunStatus) -> SinkResult<()> {
        (**self).close(status)
    }
}

/// Fans every record out to several sinks
///
/// A failure in one sink does not keep the record from reaching the others;
/// the first error is returned after all sinks were tried.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn RecordSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn RecordSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RecordSink for SinkSet {
    fn store(&mut self, record: &DetailRecord) -> SinkResult<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.store(record) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn close(&mut self, status: RunStatus) -> SinkResult<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.close(status) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Opens every sink named in the output configuration
///
/// The SQLite sink starts a new run tagged with `config_hash`.
pub fn open_sinks(output: &OutputConfig, config_hash: &str) -> SinkResult<SinkSet> {
    let mut sinks = SinkSet::new();

    if let Some(path) = &output.records_path {
        tracing::info!("Appending records to {}", path);
        sinks.push(Box::new(TextFileSink::open(Path::new(path))?));
    }

    if let Some(path) = &output.database_path {
        tracing::info!("Storing records in database {}", path);
        sinks.push(Box::new(SqliteSink::open(Path::new(path), config_hash)?));
    }

    Ok(sinks)
}
