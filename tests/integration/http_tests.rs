//! End-to-end crawls against a wiremock catalog
//!
//! The mock serves two listing pages with two books each, laid out like
//! books.toscrape.com so the default selectors apply.

use crate::common::fast_settings;
use shelfwalk::config::{parse_config, FetchConfig, SelectorConfig};
use shelfwalk::crawler::{
    run_crawl, CatalogFetcher, Coordinator, FetcherFactory, HttpFetcherFactory, Selectors,
    StopReason,
};
use shelfwalk::sink::{open_sinks, MemorySink, RecordDatabase};
use shelfwalk::{CrawlError, RunStatus};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing_page(page: u32, has_next: bool) -> String {
    let books: String = (1..=2)
        .map(|item| {
            format!(
                r#"<li><article class="product_pod">
                   <h3><a href="book-{page}_{item}/index.html" title="Book {page}.{item}">Book...</a></h3>
                   </article></li>"#
            )
        })
        .collect();
    let next = if has_next {
        format!(r#"<li class="next"><a href="page-{}.html">next</a></li>"#, page + 1)
    } else {
        String::new()
    };

    format!(
        r#"<html><body><ol class="row">{books}</ol>
           <ul class="pager"><li class="current">Page {page}</li>{next}</ul>
           </body></html>"#
    )
}

const DETAIL_PAGE: &str = r#"
    <html><body>
    <ul class="breadcrumb">
      <li><a href="../../index.html">Home</a></li>
      <li><a href="../category/books_1/index.html">Books</a></li>
      <li><a href="../category/books/travel_2/index.html">Travel</a></li>
      <li class="active">It's Only the Himalayas</li>
    </ul>
    <div id="product_gallery"><img src="../../media/cache/6d/41/6d41.jpg" alt="cover"/></div>
    <div class="product_main">
      <h1>It's Only the Himalayas</h1>
      <p class="price_color">£45.17</p>
      <p class="instock availability">
          In stock (19 available)
      </p>
      <p class="star-rating Two"></p>
    </div>
    <div id="product_description"><h2>Product Description</h2></div>
    <p>Wanderlust caught me early.</p>
    <table class="table table-striped">
      <tr><th>UPC</th><td>a22124811bfa8350</td></tr>
      <tr><th>Availability</th><td>In stock (19 available)</td></tr>
    </table>
    </body></html>
"#;

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html")
}

async fn catalog_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(html(listing_page(1, true)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(html(listing_page(2, false)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/catalogue/book-\d+_\d+/index\.html$"))
        .respond_with(html(DETAIL_PAGE))
        .mount(&server)
        .await;

    server
}

fn http_factory() -> HttpFetcherFactory {
    let selectors = Selectors::compile(&SelectorConfig::default()).unwrap();
    HttpFetcherFactory::new(FetchConfig::default(), Arc::new(selectors))
}

fn start_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/catalogue/page-1.html", server.uri())).unwrap()
}

#[tokio::test]
async fn test_http_fetcher_parses_detail_page() {
    let server = catalog_server().await;
    let fetcher = http_factory().launch(0).unwrap();

    let url = Url::parse(&format!("{}/catalogue/book-1_1/index.html", server.uri())).unwrap();
    let record = fetcher.fetch_detail_record(&url).await.unwrap();

    assert_eq!(record.title, "It's Only the Himalayas");
    assert_eq!(record.price, "£45.17");
    assert_eq!(record.availability, "In stock (19 available)");
    assert_eq!(record.rating, "Two");
    assert_eq!(record.category, "Travel");
    assert_eq!(record.description, "Wanderlust caught me early.");
    assert_eq!(
        record.image_url,
        format!("{}/media/cache/6d/41/6d41.jpg", server.uri())
    );
    assert_eq!(record.url, url.as_str());
}

#[tokio::test]
async fn test_http_fetcher_reports_missing_page() {
    let server = catalog_server().await;
    let fetcher = http_factory().launch(0).unwrap();

    let url = Url::parse(&format!("{}/catalogue/page-99.html", server.uri())).unwrap();
    match fetcher.fetch_listing_page(&url).await {
        Err(CrawlError::Status { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected a 404, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_fetcher_rejects_non_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let fetcher = http_factory().launch(0).unwrap();
    assert!(matches!(
        fetcher.fetch_listing_page(&start_url(&server)).await,
        Err(CrawlError::ContentMismatch { .. })
    ));
}

#[tokio::test]
async fn test_crawl_mock_catalog_into_memory() {
    let server = catalog_server().await;
    let sink = MemorySink::new();
    let mut coordinator = Coordinator::new(fast_settings(2), http_factory(), sink.clone());

    let report = tokio::time::timeout(Duration::from_secs(10), coordinator.run(start_url(&server)))
        .await
        .expect("crawl did not stop in time")
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::Quiescent);
    assert_eq!(report.counters.pages_discovered, 2);
    assert_eq!(report.counters.records_processed, 4);

    let mut urls: Vec<String> = sink.records().into_iter().map(|r| r.url).collect();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            format!("{}/catalogue/book-1_1/index.html", server.uri()),
            format!("{}/catalogue/book-1_2/index.html", server.uri()),
            format!("{}/catalogue/book-2_1/index.html", server.uri()),
            format!("{}/catalogue/book-2_2/index.html", server.uri()),
        ]
    );
}

#[tokio::test]
async fn test_crawl_writes_text_file_and_database() {
    let server = catalog_server().await;
    let dir = tempfile::tempdir().unwrap();
    let records_path = dir.path().join("books.txt");
    let database_path = dir.path().join("books.db");

    let config = parse_config(&format!(
        r#"
        [crawler]
        start-url = "{}/catalogue/page-1.html"
        workers = 2
        idle-threshold = 3
        tick-interval-ms = 20
        task-wait-ms = 20
        result-wait-ms = 5
        grace-period-ms = 500

        [output]
        records-path = "{}"
        database-path = "{}"
        "#,
        server.uri(),
        records_path.display(),
        database_path.display()
    ))
    .unwrap();

    let report = tokio::time::timeout(Duration::from_secs(10), run_crawl(config, "test-hash"))
        .await
        .expect("crawl did not stop in time")
        .unwrap();

    assert_eq!(report.counters.records_processed, 4);
    assert_eq!(report.run_status(), RunStatus::Completed);

    let text = std::fs::read_to_string(&records_path).unwrap();
    assert_eq!(text.matches("Title: It's Only the Himalayas").count(), 4);
    assert_eq!(text.matches("URL: ").count(), 4);
    assert_eq!(text.matches("  UPC: a22124811bfa8350\n").count(), 4);

    let db = RecordDatabase::open(&database_path).unwrap();
    assert_eq!(db.count_records().unwrap(), 4);
    let run = db.get_latest_run().unwrap().unwrap();
    let stored = db.records_for_run(run.id).unwrap();
    assert_eq!(
        stored[0].product_information,
        vec![
            ("UPC".to_string(), "a22124811bfa8350".to_string()),
            ("Availability".to_string(), "In stock (19 available)".to_string()),
        ]
    );
    assert_eq!(db.count_distinct_urls().unwrap(), 4);
    let run = db.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.record_count, 4);
    assert_eq!(run.config_hash, "test-hash");
}

#[tokio::test]
async fn test_second_run_appends() {
    let server = catalog_server().await;
    let dir = tempfile::tempdir().unwrap();
    let output = shelfwalk::config::OutputConfig {
        records_path: Some(dir.path().join("books.txt").display().to_string()),
        database_path: Some(dir.path().join("books.db").display().to_string()),
    };

    for _ in 0..2 {
        let sinks = open_sinks(&output, "hash").unwrap();
        let mut coordinator = Coordinator::new(fast_settings(2), http_factory(), sinks);
        coordinator.run(start_url(&server)).await.unwrap();
    }

    let text = std::fs::read_to_string(dir.path().join("books.txt")).unwrap();
    assert_eq!(text.matches("URL: ").count(), 8);

    let db = RecordDatabase::open(&dir.path().join("books.db")).unwrap();
    assert_eq!(db.count_runs().unwrap(), 2);
    assert_eq!(db.count_records().unwrap(), 8);
    assert_eq!(db.count_distinct_urls().unwrap(), 4);
}
