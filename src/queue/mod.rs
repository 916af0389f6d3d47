//! Work and result queues shared between the coordinator and its workers
//!
//! - `TaskQueue`: listing pages waiting to be fetched (many consumers)
//! - `ResultSender` / `ResultReceiver`: tagged messages flowing back from
//!   workers to the coordinator (many producers, one consumer)

mod results;
mod task_queue;

pub use results::{
    result_channel, DetailRecord, ResultMessage, ResultReceiver, ResultSender, MISSING_FIELD,
    UNKNOWN_RATING,
};
pub use task_queue::{Task, TaskQueue};
