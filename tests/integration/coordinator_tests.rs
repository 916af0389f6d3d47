//! Coordinator behavior against the scripted catalog

use crate::common::{fast_settings, start_url, ScriptedCatalog};
use shelfwalk::crawler::{Coordinator, CoordinatorSettings, StopReason};
use shelfwalk::sink::MemorySink;
use shelfwalk::{CoordinatorState, RunStatus};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Upper bound on any single test crawl
const TEST_DEADLINE: Duration = Duration::from_secs(10);

async fn crawl(
    catalog: ScriptedCatalog,
    settings: CoordinatorSettings,
) -> (shelfwalk::RunReport, MemorySink) {
    let sink = MemorySink::new();
    let mut coordinator = Coordinator::new(settings, catalog, sink.clone());

    let report = tokio::time::timeout(TEST_DEADLINE, coordinator.run(start_url()))
        .await
        .expect("crawl did not stop in time")
        .expect("crawl failed");

    assert_eq!(coordinator.state(), CoordinatorState::Stopped);
    (report, sink)
}

#[tokio::test]
async fn test_full_crawl_three_pages() {
    let (report, sink) = crawl(ScriptedCatalog::new(3, 2), fast_settings(3)).await;

    assert_eq!(report.stop_reason, StopReason::Quiescent);
    assert_eq!(report.state, CoordinatorState::Stopped);
    assert_eq!(report.counters.pages_discovered, 3);
    assert_eq!(report.counters.records_processed, 6);
    assert_eq!(report.counters.tasks_completed, 3);
    assert_eq!(report.counters.worker_restarts, 0);

    assert_eq!(sink.store_calls(), 6);
    assert_eq!(sink.closed_with(), Some(RunStatus::Completed));

    let titles: HashSet<String> = sink.records().into_iter().map(|r| r.title).collect();
    let expected: HashSet<String> = (1..=3)
        .flat_map(|page| (1..=2).map(move |item| format!("book-{page}-{item}")))
        .collect();
    assert_eq!(titles, expected);
}

#[tokio::test]
async fn test_single_page_catalog() {
    let (report, sink) = crawl(ScriptedCatalog::new(1, 0), fast_settings(2)).await;

    assert_eq!(report.stop_reason, StopReason::Quiescent);
    assert_eq!(report.counters.pages_discovered, 1);
    assert_eq!(report.counters.records_processed, 0);
    assert_eq!(report.counters.tasks_completed, 1);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_failed_detail_does_not_stop_the_page() {
    let catalog = ScriptedCatalog::builder(3, 2).failing_detail(2, 1).build();
    let (report, sink) = crawl(catalog, fast_settings(3)).await;

    assert_eq!(report.counters.pages_discovered, 3);
    assert_eq!(report.counters.records_processed, 5);
    assert_eq!(report.counters.tasks_completed, 3);
    assert!(!sink.records().iter().any(|r| r.title == "book-2-1"));
}

#[tokio::test]
async fn test_panicking_page_is_skipped_without_losing_the_worker() {
    let catalog = ScriptedCatalog::builder(3, 2).panic_once_on_page(2).build();
    let observer = catalog.clone();
    let (report, sink) = crawl(catalog, fast_settings(2)).await;

    assert_eq!(report.stop_reason, StopReason::Quiescent);
    assert_eq!(report.counters.worker_restarts, 0);
    assert_eq!(report.counters.tasks_redelivered, 0);
    assert_eq!(observer.launches(), 2);
    // Page 2 never reported its successor
    assert_eq!(report.counters.pages_discovered, 2);
    assert_eq!(report.counters.tasks_completed, 2);
    assert_eq!(report.counters.records_processed, 2);
    assert_eq!(sink.store_calls(), 2);
}

#[tokio::test]
async fn test_page_that_always_panics_does_not_stall_the_crawl() {
    let catalog = ScriptedCatalog::builder(4, 2).panic_always_on_page(2).build();
    let (report, sink) = crawl(catalog, fast_settings(3)).await;

    assert_eq!(report.stop_reason, StopReason::Quiescent);
    assert_eq!(report.counters.tasks_completed, report.counters.pages_discovered);
    assert_eq!(report.counters.tasks_abandoned, 0);
    assert_eq!(report.counters.worker_restarts, 0);
    assert_eq!(sink.len(), 2);
    assert_eq!(sink.closed_with(), Some(RunStatus::Completed));
}

#[tokio::test]
async fn test_workers_that_fail_to_start_are_restarted() {
    let catalog = ScriptedCatalog::builder(2, 2).init_failures(2).build();
    let observer = catalog.clone();
    let (report, sink) = crawl(catalog, fast_settings(2)).await;

    assert_eq!(report.counters.worker_restarts, 2);
    assert_eq!(observer.launches(), 4);
    assert_eq!(report.counters.pages_discovered, 2);
    assert_eq!(sink.len(), 4);
}

#[tokio::test]
async fn test_shortfall_ceiling_bounds_the_wait() {
    let settings = CoordinatorSettings {
        expected_pages: Some(10),
        max_shortfall_extensions: 2,
        ..fast_settings(2)
    };
    let (report, sink) = crawl(ScriptedCatalog::new(2, 1), settings).await;

    assert_eq!(
        report.stop_reason,
        StopReason::ShortfallCeiling { pages_short: 8 }
    );
    assert_eq!(report.counters.pages_discovered, 2);
    assert_eq!(sink.closed_with(), Some(RunStatus::Completed));
}

#[tokio::test]
async fn test_expected_pages_reached_stops_normally() {
    let settings = CoordinatorSettings {
        expected_pages: Some(3),
        ..fast_settings(2)
    };
    let (report, _sink) = crawl(ScriptedCatalog::new(3, 1), settings).await;

    assert_eq!(report.stop_reason, StopReason::Quiescent);
    assert_eq!(report.counters.pages_discovered, 3);
}

#[tokio::test]
async fn test_interrupt_stops_a_long_crawl() {
    let catalog = ScriptedCatalog::builder(1000, 1)
        .listing_delay(Duration::from_millis(20))
        .build();
    let stop = CancellationToken::new();
    let sink = MemorySink::new();
    let mut coordinator =
        Coordinator::new(fast_settings(2), catalog, sink.clone()).with_stop_signal(stop.clone());

    let interrupter = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        stop.cancel();
    });

    let report = tokio::time::timeout(TEST_DEADLINE, coordinator.run(start_url()))
        .await
        .expect("crawl did not stop in time")
        .expect("crawl failed");
    interrupter.await.unwrap();

    assert_eq!(report.stop_reason, StopReason::Interrupted);
    assert_eq!(report.state, CoordinatorState::Stopped);
    assert!(report.counters.pages_discovered < 1000);
    assert_eq!(sink.closed_with(), Some(RunStatus::Interrupted));
    // Every record a worker produced was handed to the sink, even after stop
    assert_eq!(report.counters.records_processed, sink.store_calls() as u64);
}

#[tokio::test]
async fn test_stop_before_start() {
    let stop = CancellationToken::new();
    stop.cancel();
    let sink = MemorySink::new();
    let mut coordinator = Coordinator::new(fast_settings(1), ScriptedCatalog::new(3, 1), sink.clone())
        .with_stop_signal(stop);

    let report = coordinator.run(start_url()).await.unwrap();

    assert_eq!(report.stop_reason, StopReason::Interrupted);
    assert_eq!(coordinator.state(), CoordinatorState::Stopped);
    assert_eq!(report.counters.pages_discovered, 1);
    assert_eq!(sink.closed_with(), Some(RunStatus::Interrupted));
}

#[tokio::test]
async fn test_rejects_non_http_start_url() {
    let mut coordinator = Coordinator::new(
        fast_settings(1),
        ScriptedCatalog::new(1, 1),
        MemorySink::new(),
    );

    let result = coordinator
        .run(Url::parse("ftp://books.example/catalogue/page-1.html").unwrap())
        .await;
    assert!(result.is_err());
    assert_eq!(coordinator.state(), CoordinatorState::Seeding);
}
