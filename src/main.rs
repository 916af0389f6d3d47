//! Shelfwalk main entry point
//!
//! This is the command-line interface for the Shelfwalk catalog crawler.

use anyhow::{bail, Context, Result};
use clap::Parser;
use shelfwalk::config::{load_config_with_hash, validate, Config};
use shelfwalk::crawler::run_crawl;
use shelfwalk::output::{load_statistics, print_run_report, print_statistics};
use shelfwalk::sink::RecordDatabase;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Shelfwalk: a catalog crawler with a self-extending work queue
///
/// Shelfwalk starts from one listing page, follows "next" links as workers
/// discover them, scrapes every detail page it finds and stops once the
/// crawl has been quiet for long enough.
#[derive(Parser, Debug)]
#[command(name = "shelfwalk")]
#[command(version)]
#[command(about = "A paginated catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the number of fetch workers
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Override the first listing page
    #[arg(long, value_name = "URL")]
    start_url: Option<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the record database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration: {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelfwalk=info,warn"),
            1 => EnvFilter::new("shelfwalk=debug,info"),
            2 => EnvFilter::new("shelfwalk=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides and re-validates the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if cli.workers.is_none() && cli.start_url.is_none() {
        return Ok(());
    }

    if let Some(workers) = cli.workers {
        tracing::info!("Overriding workers: {}", workers);
        config.crawler.workers = workers;
    }
    if let Some(start_url) = &cli.start_url {
        tracing::info!("Overriding start URL: {}", start_url);
        config.crawler.start_url = start_url.clone();
    }

    validate(config).context("Invalid command-line override")?;
    Ok(())
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;

    println!("=== Shelfwalk Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", crawler.start_url);
    println!("  Workers: {}", crawler.workers);
    match crawler.expected_pages {
        Some(pages) => println!(
            "  Expected pages: {} (up to {} extensions)",
            pages, crawler.max_shortfall_extensions
        ),
        None => println!("  Expected pages: unknown"),
    }
    println!(
        "  Idle threshold: {} ticks of {}ms",
        crawler.idle_threshold, crawler.tick_interval_ms
    );
    println!("  Grace period: {}ms", crawler.grace_period_ms);
    println!(
        "  Requeue on crash: {} (at most {} times)",
        crawler.redeliver_on_crash, crawler.max_redeliveries
    );

    println!("\nFetch:");
    println!("  User agent: {}", config.fetch.user_agent);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.fetch.request_timeout_secs, config.fetch.connect_timeout_secs
    );

    println!("\nOutput:");
    if let Some(path) = &config.output.records_path {
        println!("  Records file: {}", path);
    }
    if let Some(path) = &config.output.database_path {
        println!("  Database: {}", path);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the record database
fn handle_stats(config: &Config) -> Result<()> {
    let Some(path) = config.output.database_path.as_deref() else {
        bail!("--stats needs output.database-path to be set");
    };

    println!("Database: {}\n", path);

    let db = RecordDatabase::open(Path::new(path))
        .with_context(|| format!("Failed to open database: {}", path))?;
    let stats = load_statistics(&db).context("Failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> Result<()> {
    tracing::info!(
        "Starting crawl at {} with {} workers",
        config.crawler.start_url,
        config.crawler.workers
    );

    let report = run_crawl(config, config_hash).await.context("Crawl failed")?;
    print_run_report(&report);

    Ok(())
}
