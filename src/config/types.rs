use serde::Deserialize;

/// Main configuration structure for Shelfwalk
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    pub output: OutputConfig,
}

/// Worker pool and coordinator timing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// First listing page; every other page is discovered from it
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Number of fetch workers kept alive while crawling
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Number of listing pages the catalog is expected to have, if known
    #[serde(rename = "expected-pages", default)]
    pub expected_pages: Option<u64>,

    /// Consecutive idle monitoring ticks required before stopping
    #[serde(rename = "idle-threshold", default = "default_idle_threshold")]
    pub idle_threshold: u32,

    /// How often the coordinator runs its monitoring cycle (milliseconds)
    #[serde(rename = "tick-interval-ms", default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// How long a worker waits on the task queue before re-checking the stop signal (milliseconds)
    #[serde(rename = "task-wait-ms", default = "default_task_wait_ms")]
    pub task_wait_ms: u64,

    /// How long the coordinator waits for each result while draining (milliseconds)
    #[serde(rename = "result-wait-ms", default = "default_result_wait_ms")]
    pub result_wait_ms: u64,

    /// Maximum number of results drained per monitoring tick
    #[serde(rename = "drain-burst", default = "default_drain_burst")]
    pub drain_burst: usize,

    /// How long workers get to exit on their own after stop (milliseconds)
    #[serde(rename = "grace-period-ms", default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// How many times a page-count shortfall may postpone stopping
    #[serde(
        rename = "max-shortfall-extensions",
        default = "default_max_shortfall_extensions"
    )]
    pub max_shortfall_extensions: u32,

    /// Requeue the task a worker was holding when it crashed
    #[serde(rename = "redeliver-on-crash", default = "default_true")]
    pub redeliver_on_crash: bool,

    /// How many times one crashed task may be requeued before it is dropped
    #[serde(rename = "max-redeliveries", default = "default_max_redeliveries")]
    pub max_redeliveries: u32,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// CSS selectors used to pick apart listing and detail pages
///
/// Defaults match the books.toscrape.com markup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    #[serde(rename = "detail-link")]
    pub detail_link: String,
    #[serde(rename = "next-page")]
    pub next_page: String,
    pub title: String,
    pub price: String,
    pub availability: String,
    pub rating: String,
    pub category: String,
    pub description: String,
    pub image: String,
    /// Rows of the product information table; each row has a `th` and a `td`
    #[serde(rename = "product-info")]
    pub product_info: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            detail_link: "h3 > a".to_string(),
            next_page: "ul.pager li.next a".to_string(),
            title: "h1".to_string(),
            price: "p.price_color".to_string(),
            availability: "p.availability".to_string(),
            rating: "p.star-rating".to_string(),
            category: "ul.breadcrumb li:nth-child(3) a".to_string(),
            description: "#product_description + p".to_string(),
            image: "#product_gallery img".to_string(),
            product_info: "table.table.table-striped tr".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Plain-text file records are appended to
    #[serde(rename = "records-path", default)]
    pub records_path: Option<String>,

    /// SQLite database records are inserted into
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,
}

fn default_workers() -> usize {
    3
}

fn default_idle_threshold() -> u32 {
    15
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_task_wait_ms() -> u64 {
    5000
}

fn default_result_wait_ms() -> u64 {
    100
}

fn default_drain_burst() -> usize {
    256
}

fn default_grace_period_ms() -> u64 {
    5000
}

fn default_max_shortfall_extensions() -> u32 {
    10
}

fn default_max_redeliveries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("shelfwalk/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}
