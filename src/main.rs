//! Wikidex main entry point
//!
//! This is the command-line interface for the Wikidex catalog builder.

use clap::Parser;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wikidex::catalog::Checkpoint;
use wikidex::config::{load_config_with_hash, Config};
use wikidex::crawler::{preview_run, Coordinator};
use wikidex::output::{print_collection_stats, print_run_summary, CollectionStats, RunStats};

/// Wikidex: a polite, resumable catalog builder
///
/// Wikidex reads the wiki's index page, visits every entry it lists and
/// keeps a local catalog (CSV + JSON). Pages are cached and progress is
/// recorded, so a run can be stopped with Ctrl+C and resumed later.
#[derive(Parser, Debug)]
#[command(name = "wikidex")]
#[command(version = "1.0.0")]
#[command(about = "A polite, resumable wiki catalog builder", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// How many NEW entries to collect this run (0 = no limit)
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Save progress every N new entries
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Seconds to wait after each download
    #[arg(long, value_name = "SEC", value_parser = parse_seconds)]
    delay: Option<u64>,

    /// Extra seconds to wait after each saved batch
    #[arg(long, value_name = "SEC", value_parser = parse_seconds)]
    batch_delay: Option<u64>,

    /// Folder for cached pages
    #[arg(long, value_name = "DIR")]
    cache: Option<PathBuf>,

    /// File that lists processed pages
    #[arg(long, value_name = "FILE")]
    progress_file: Option<PathBuf>,

    /// CSV checkpoint path
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// JSON checkpoint path
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Re-download every page (the cache is still updated)
    #[arg(long)]
    refresh: bool,

    /// Clear progress and rebuild the catalog from cached pages
    #[arg(long)]
    rebuild: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Also write log output to FILE
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Validate config and show what would be crawled without fetching or writing
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for the existing catalog and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(limit) = self.limit {
            config.crawler.limit = limit;
        }
        if let Some(batch_size) = self.batch_size {
            config.crawler.batch_size = batch_size;
        }
        if let Some(delay) = self.delay {
            config.crawler.request_delay_ms = delay;
        }
        if let Some(delay) = self.batch_delay {
            config.crawler.batch_delay_ms = delay;
        }
        if let Some(dir) = &self.cache {
            config.output.cache_dir = dir.clone();
        }
        if let Some(path) = &self.progress_file {
            config.output.progress_file = path.clone();
        }
        if let Some(path) = &self.csv {
            config.output.csv_path = path.clone();
        }
        if let Some(path) = &self.json {
            config.output.json_path = path.clone();
        }
        config.crawler.refresh |= self.refresh;
        config.crawler.rebuild |= self.rebuild;
    }
}

/// Parses a non-negative number of seconds into milliseconds
fn parse_seconds(value: &str) -> Result<u64, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("'{}' must be zero or more seconds", value));
    }
    Ok((seconds * 1000.0).round() as u64)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.log.as_deref())?;

    // Load configuration, then apply CLI overrides and validate
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);
    config.validate()?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, cli.verbose > 0).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a log file, a second layer writes the same events without ANSI codes.
fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wikidex=info,warn"),
            1 => EnvFilter::new("wikidex=debug,info"),
            2 => EnvFilter::new("wikidex=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let file_layer = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| format!("Log path '{}' has no file name", path.display()))?;
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir)?;

            let appender = RollingFileAppender::new(Rotation::NEVER, dir, file_name);
            Some(
                fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false),
        )
        .with(file_layer)
        .init();

    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let preview = preview_run(config)?;

    println!("=== Wikidex Dry Run ===\n");

    println!("Source:");
    println!("  Index page: {}", preview.index_url);
    println!("  User agent: {}", config.user_agent.header_value());

    println!("\nCrawler Configuration:");
    match config.crawler.entry_limit() {
        Some(limit) => println!("  Limit: {} new entries", limit),
        None => println!("  Limit: none"),
    }
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Batch delay: {}ms", config.crawler.batch_delay_ms);
    println!("  Page timeout: {}s", config.crawler.page_timeout_secs);
    println!("  Refresh: {}", config.crawler.refresh);
    println!("  Rebuild: {}", config.crawler.rebuild);

    println!("\nOutput:");
    println!("  Cache: {}", preview.cache_dir.display());
    println!("  Progress: {}", config.output.progress_file.display());
    println!("  CSV: {}", config.output.csv_path.display());
    println!("  JSON: {}", config.output.json_path.display());

    println!("\nCurrent State:");
    println!("  Catalog entries: {}", preview.catalog_entries);
    println!("  Processed URLs: {}", preview.processed);
    println!("  Rejected URLs: {}", preview.rejected);
    match preview.cached_pages {
        Some(count) => println!("  Cached pages: {}", count),
        None => println!("  Cached pages: none (cache directory missing)"),
    }

    println!("\n✓ Configuration is valid");
    if config.crawler.rebuild {
        println!("✓ Would clear progress and rebuild the catalog from cache");
    } else {
        match preview.pending {
            Some(pending) => println!("✓ Would visit up to {} unprocessed pages", pending),
            None => println!("✓ Would fetch the index page to find pages to visit"),
        }
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics for the existing catalog
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Catalog: {}\n", config.output.csv_path.display());

    let checkpoint = Checkpoint::new(&config.output.csv_path, &config.output.json_path);
    let store = checkpoint.load()?;

    if store.is_empty() {
        println!("No entries collected yet. Run without --stats to start.");
        return Ok(());
    }

    let collection = CollectionStats::from_entries(store.entries());
    print_collection_stats(&collection);

    Ok(())
}

/// Sets `cancel` on the first interrupt; returns true on a second one
///
/// The ledger is appended per page, so quitting before the final checkpoint
/// only loses catalog rows, which the next run re-derives from the cache.
async fn watch_interrupts<F, Fut>(mut next_signal: F, cancel: Arc<AtomicBool>) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    tracing::warn!("Ctrl+C received; finishing the current page (press again to quit now)");
    cancel.store(true, Ordering::SeqCst);

    if next_signal().await.is_err() {
        return false;
    }
    tracing::warn!("Second Ctrl+C received; quitting without the final checkpoint");
    true
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if watch_interrupts(tokio::signal::ctrl_c, cancel).await {
                std::process::exit(130);
            }
        });
    }

    if config.crawler.refresh {
        tracing::info!("Refresh mode: every page will be downloaded again");
    }

    let mut coordinator = Coordinator::new(config, cancel)?;
    let mut stats = RunStats::new();

    // Run the crawler; the summary is printed even if the run failed
    let result = coordinator.run(&mut stats).await;
    print_run_summary(&stats, verbose);

    match result {
        Ok(()) => {
            tracing::info!("Run completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
