//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CoordinatorState`: lifecycle of a run (seeding, running, draining, stopped)
//! - `ProgressCounters`: counters kept by the coordinator's monitoring loop
//! - `QuiescenceDetector`: decides when an idle crawl is really finished
//! - `WorkerHandle`: the coordinator's view of one worker

mod coordinator_state;
mod progress;
mod worker_handle;

pub use coordinator_state::CoordinatorState;
pub use progress::{ProgressCounters, QuiescenceDetector, TickObservation, TickVerdict};
pub use worker_handle::{InFlightSlot, WorkerExit, WorkerHandle};
