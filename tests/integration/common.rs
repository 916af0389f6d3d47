//! Shared fixtures: a scripted catalog backend and fast coordinator settings

use shelfwalk::crawler::{CatalogFetcher, CoordinatorSettings, FetcherFactory, ListingPage};
use shelfwalk::{CrawlError, DetailRecord};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const START_URL: &str = "https://books.example/catalogue/page-1.html";

pub fn start_url() -> Url {
    Url::parse(START_URL).unwrap()
}

/// Settings with short ticks so tests finish in well under a second
pub fn fast_settings(workers: usize) -> CoordinatorSettings {
    CoordinatorSettings {
        workers,
        idle_threshold: 3,
        tick_interval: Duration::from_millis(20),
        task_wait: Duration::from_millis(20),
        result_wait: Duration::from_millis(5),
        drain_burst: 64,
        grace_period: Duration::from_millis(500),
        ..CoordinatorSettings::default()
    }
}

/// A paginated catalog served from memory
///
/// Page `k` lists `details_per_page` books named `book-k-i` and links to page
/// `k + 1` until `pages` is reached.
#[derive(Clone)]
pub struct ScriptedCatalog {
    inner: Arc<Inner>,
}

struct Inner {
    pages: u32,
    details_per_page: u32,
    failing_details: HashSet<String>,
    panic_on_page: Mutex<Option<u32>>,
    panic_always: bool,
    init_failures: AtomicU32,
    launches: AtomicUsize,
    listing_delay: Duration,
}

impl ScriptedCatalog {
    pub fn new(pages: u32, details_per_page: u32) -> Self {
        Self::builder(pages, details_per_page).build()
    }

    pub fn builder(pages: u32, details_per_page: u32) -> CatalogBuilder {
        CatalogBuilder {
            pages,
            details_per_page,
            failing_details: HashSet::new(),
            panic_on_page: None,
            panic_always: false,
            init_failures: 0,
            listing_delay: Duration::ZERO,
        }
    }

    pub fn launches(&self) -> usize {
        self.inner.launches.load(Ordering::SeqCst)
    }
}

pub struct CatalogBuilder {
    pages: u32,
    details_per_page: u32,
    failing_details: HashSet<String>,
    panic_on_page: Option<u32>,
    panic_always: bool,
    init_failures: u32,
    listing_delay: Duration,
}

impl CatalogBuilder {
    /// Makes the detail page `book-{page}-{item}` time out
    pub fn failing_detail(mut self, page: u32, item: u32) -> Self {
        self.failing_details.insert(format!("book-{page}-{item}"));
        self
    }

    /// Panics the first time listing page `page` is fetched
    pub fn panic_once_on_page(mut self, page: u32) -> Self {
        self.panic_on_page = Some(page);
        self
    }

    /// Panics every time listing page `page` is fetched
    pub fn panic_always_on_page(mut self, page: u32) -> Self {
        self.panic_on_page = Some(page);
        self.panic_always = true;
        self
    }

    /// Fails the first `count` fetcher launches
    pub fn init_failures(mut self, count: u32) -> Self {
        self.init_failures = count;
        self
    }

    pub fn listing_delay(mut self, delay: Duration) -> Self {
        self.listing_delay = delay;
        self
    }

    pub fn build(self) -> ScriptedCatalog {
        ScriptedCatalog {
            inner: Arc::new(Inner {
                pages: self.pages,
                details_per_page: self.details_per_page,
                failing_details: self.failing_details,
                panic_on_page: Mutex::new(self.panic_on_page),
                panic_always: self.panic_always,
                init_failures: AtomicU32::new(self.init_failures),
                launches: AtomicUsize::new(0),
                listing_delay: self.listing_delay,
            }),
        }
    }
}

impl FetcherFactory for ScriptedCatalog {
    type Fetcher = ScriptedFetcher;

    fn launch(&self, worker_index: usize) -> Result<ScriptedFetcher, CrawlError> {
        self.inner.launches.fetch_add(1, Ordering::SeqCst);

        let failed = self
            .inner
            .init_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(CrawlError::WorkerInit {
                index: worker_index,
                message: "scripted launch failure".to_string(),
            });
        }

        Ok(ScriptedFetcher {
            inner: Arc::clone(&self.inner),
        })
    }
}

pub struct ScriptedFetcher {
    inner: Arc<Inner>,
}

fn page_number(url: &Url) -> Option<u32> {
    url.path()
        .rsplit('/')
        .next()?
        .strip_prefix("page-")?
        .strip_suffix(".html")?
        .parse()
        .ok()
}

impl CatalogFetcher for ScriptedFetcher {
    async fn fetch_listing_page(&self, url: &Url) -> Result<ListingPage, CrawlError> {
        if !self.inner.listing_delay.is_zero() {
            tokio::time::sleep(self.inner.listing_delay).await;
        }

        let page = match page_number(url) {
            Some(page) if (1..=self.inner.pages).contains(&page) => page,
            _ => {
                return Err(CrawlError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            }
        };

        let should_panic = {
            let mut panic_on = self.inner.panic_on_page.lock().unwrap();
            if *panic_on == Some(page) {
                if !self.inner.panic_always {
                    *panic_on = None;
                }
                true
            } else {
                false
            }
        };
        if should_panic {
            panic!("scripted crash on page {page}");
        }

        Ok(ListingPage {
            detail_links: (1..=self.inner.details_per_page)
                .map(|item| format!("book-{page}-{item}/index.html"))
                .collect(),
            next_page: (page < self.inner.pages).then(|| format!("page-{}.html", page + 1)),
        })
    }

    async fn fetch_detail_record(&self, url: &Url) -> Result<DetailRecord, CrawlError> {
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.nth(1))
            .unwrap_or_default()
            .to_string();

        if self.inner.failing_details.contains(&name) {
            return Err(CrawlError::Timeout {
                url: url.to_string(),
            });
        }

        Ok(DetailRecord {
            title: name,
            price: "£10.00".to_string(),
            availability: "In stock (5 available)".to_string(),
            rating: "Four".to_string(),
            ..DetailRecord::placeholder(url)
        })
    }
}
