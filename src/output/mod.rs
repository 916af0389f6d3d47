//! Console output for finished crawls and stored results
//!
//! - `report`: the summary printed when a crawl ends
//! - `stats`: statistics over a record database (`--stats`)

pub mod report;
pub mod stats;

pub use report::{format_run_report, print_run_report};
pub use stats::{load_statistics, print_statistics, RecordStatistics};
