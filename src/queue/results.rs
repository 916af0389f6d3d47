//! Messages flowing from fetch workers back to the coordinator

use crate::CrawlError;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use url::Url;

/// Placeholder stored when a detail field could not be extracted
pub const MISSING_FIELD: &str = "N/A";

/// Placeholder stored when a detail page has no rating
pub const UNKNOWN_RATING: &str = "Unknown";

/// A scraped detail page
///
/// Fields that could not be extracted hold [`MISSING_FIELD`] (or
/// [`UNKNOWN_RATING`] for the rating) instead of failing the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub title: String,
    pub price: String,
    pub availability: String,
    pub rating: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
    pub url: String,
    /// Rows of the product information table as `(name, value)`, in page order
    pub product_information: Vec<(String, String)>,
}

impl DetailRecord {
    /// Creates a record with only the URL known and every other field missing
    pub fn placeholder(url: &Url) -> Self {
        Self {
            title: MISSING_FIELD.to_string(),
            price: MISSING_FIELD.to_string(),
            availability: MISSING_FIELD.to_string(),
            rating: UNKNOWN_RATING.to_string(),
            category: MISSING_FIELD.to_string(),
            description: MISSING_FIELD.to_string(),
            image_url: MISSING_FIELD.to_string(),
            url: url.to_string(),
            product_information: Vec::new(),
        }
    }
}

/// A message emitted by a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultMessage {
    /// A scraped detail page, forwarded to the record sink
    DetailRecord(DetailRecord),

    /// A listing page discovered while processing another one
    NewTask { url: Url },

    /// One task was fully processed, whatever its outcome
    TaskDone,
}

/// Creates a connected result sender/receiver pair
pub fn result_channel() -> (ResultSender, ResultReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ResultSender { tx }, ResultReceiver { rx })
}

/// Producing side of the result channel; cheap to clone per worker
#[derive(Debug, Clone)]
pub struct ResultSender {
    tx: mpsc::UnboundedSender<ResultMessage>,
}

impl ResultSender {
    /// Sends a message without blocking
    ///
    /// Fails only when the coordinator has dropped its receiver.
    pub fn send(&self, message: ResultMessage) -> Result<(), CrawlError> {
        self.tx.send(message).map_err(|_| CrawlError::ChannelClosed)
    }
}

/// Consuming side of the result channel, owned by the coordinator
#[derive(Debug)]
pub struct ResultReceiver {
    rx: mpsc::UnboundedReceiver<ResultMessage>,
}

impl ResultReceiver {
    /// Waits at most `timeout` for the next message
    ///
    /// Returns `None` on timeout or when every sender is gone.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<ResultMessage> {
        tokio::time::timeout(timeout, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Takes a message if one is ready right now
    pub fn try_recv(&mut self) -> Option<ResultMessage> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}
