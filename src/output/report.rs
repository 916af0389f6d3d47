//! End-of-crawl summary

use crate::crawler::RunReport;

/// Renders a run report as the block printed after a crawl
pub fn format_run_report(report: &RunReport) -> String {
    let counters = &report.counters;
    let seconds = report.elapsed.as_secs_f64();
    let rate = if seconds > 0.0 {
        counters.records_processed as f64 / seconds
    } else {
        0.0
    };

    let mut out = String::new();
    out.push_str("=== Crawl Summary ===\n");
    out.push_str(&format!("Stopped: {} ({})\n", report.stop_reason.as_str(), report.state));
    out.push_str(&format!("Pages discovered: {}\n", counters.pages_discovered));
    out.push_str(&format!("Pages completed: {}\n", counters.tasks_completed));
    out.push_str(&format!("Records processed: {}\n", counters.records_processed));
    out.push_str(&format!("Elapsed: {:.1}s ({:.2} records/sec)\n", seconds, rate));

    if counters.worker_restarts > 0 {
        out.push_str(&format!(
            "Worker restarts: {} ({} pages requeued)\n",
            counters.worker_restarts, counters.tasks_redelivered
        ));
    }
    if counters.tasks_abandoned > 0 {
        out.push_str(&format!(
            "Pages abandoned after repeated crashes: {}\n",
            counters.tasks_abandoned
        ));
    }
    if counters.sink_failures > 0 {
        out.push_str(&format!("Failed stores: {}\n", counters.sink_failures));
    }
    if counters.late_pages_dropped > 0 {
        out.push_str(&format!(
            "Pages dropped after stop: {}\n",
            counters.late_pages_dropped
        ));
    }

    out
}

pub fn print_run_report(report: &RunReport) {
    print!("{}", format_run_report(report));
}
