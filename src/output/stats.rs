//! Statistics over a record database
//!
//! Backs the `--stats` command: totals across every run plus a summary of the
//! most recent one.

use crate::sink::{RecordDatabase, RunRecord, SinkResult};

/// Record database statistics summary
#[derive(Debug, Clone)]
pub struct RecordStatistics {
    /// Number of crawl runs recorded
    pub total_runs: u64,

    /// Records stored across all runs
    pub total_records: u64,

    /// Distinct detail-page URLs across all runs
    pub distinct_urls: u64,

    /// Records whose availability starts with "In stock"
    pub in_stock: u64,

    /// Record count per rating word, most common first
    pub by_rating: Vec<(String, u64)>,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from the record database
pub fn load_statistics(db: &RecordDatabase) -> SinkResult<RecordStatistics> {
    Ok(RecordStatistics {
        total_runs: db.count_runs()?,
        total_records: db.count_records()?,
        distinct_urls: db.count_distinct_urls()?,
        in_stock: db.count_in_stock()?,
        by_rating: db.records_by_rating()?,
        latest_run: db.get_latest_run()?,
    })
}

/// Wall-clock duration of a finished run, in seconds
fn run_duration_seconds(run: &RunRecord) -> Option<i64> {
    let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    let finished = run
        .finished_at
        .as_deref()?
        .parse::<chrono::DateTime<chrono::Utc>>()
        .ok()?;
    Some((finished - started).num_seconds())
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RecordStatistics) {
    println!("=== Record Statistics ===\n");

    println!("Overview:");
    println!("  Runs recorded: {}", stats.total_runs);
    println!("  Records stored: {}", stats.total_records);
    println!("  Distinct books: {}", stats.distinct_urls);
    println!(
        "  In stock: {} ({:.1}%)",
        stats.in_stock,
        percentage(stats.in_stock, stats.total_records)
    );
    println!();

    if !stats.by_rating.is_empty() {
        println!("Records by Rating:");
        for (rating, count) in &stats.by_rating {
            println!(
                "  {}: {} ({:.1}%)",
                rating,
                count,
                percentage(*count, stats.total_records)
            );
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let Some(seconds) = run_duration_seconds(run) {
                println!("  Duration: {}s", seconds);
            }
            println!("  Records: {}", run.record_count);
            println!("  Config hash: {}", run.config_hash);
        }
        None => println!("No runs recorded yet."),
    }
}
