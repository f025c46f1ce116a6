//! Batch orchestrator - main crawl loop
//!
//! This module drives a run from start to finish:
//! - Loading the previous checkpoint and the progress ledger
//! - Enumerating candidate URLs from the index page
//! - Fetching, extracting and classifying each unknown URL in order
//! - Checkpointing every `batch-size` accepted entries
//! - Handling cancellation, the entry limit and a final checkpoint

use crate::cache::ContentCache;
use crate::catalog::{CatalogStore, Checkpoint};
use crate::config::Config;
use crate::crawler::fetcher::PoliteFetcher;
use crate::crawler::parser::extract_index_urls;
use crate::extract::extract_page;
use crate::ledger::ProgressLedger;
use crate::output::{CollectionStats, RunStats};
use crate::state::RunPhase;
use crate::url::page_slug;
use crate::DexError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// Main crawl coordinator
pub struct Coordinator {
    config: Config,
    fetcher: PoliteFetcher,
    checkpoint: Checkpoint,
    store: CatalogStore,
    ledger: ProgressLedger,
    cancel: Arc<AtomicBool>,
    phase: RunPhase,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The run configuration
    /// * `cancel` - Set to true to stop the run after the current page
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(DexError)` - The cache, ledger or checkpoint could not be opened
    pub fn new(config: Config, cancel: Arc<AtomicBool>) -> Result<Self, DexError> {
        let fetcher = PoliteFetcher::from_config(&config)?;
        Self::with_fetcher(config, fetcher, cancel)
    }

    /// Creates a coordinator around an existing fetcher
    ///
    /// # Startup Steps
    ///
    /// 1. In rebuild mode, delete both ledger files and start from an empty
    ///    catalog; otherwise load the catalog from the CSV checkpoint
    /// 2. Open the ledger
    /// 3. If the catalog has rows but the ledger has no processed file,
    ///    rebuild the processed list from the catalog's URLs
    /// 4. Otherwise forget processed URLs that have no catalog row, so they
    ///    are re-derived (from cache) instead of being lost, and mark every
    ///    catalog row the ledger is missing as processed
    pub fn with_fetcher(
        config: Config,
        fetcher: PoliteFetcher,
        cancel: Arc<AtomicBool>,
    ) -> Result<Self, DexError> {
        let checkpoint = Checkpoint::new(&config.output.csv_path, &config.output.json_path);
        let progress_path = config.output.progress_file.clone();

        let store = if config.crawler.rebuild {
            tracing::info!("Rebuild mode: clearing progress to re-process every page from cache");
            ProgressLedger::clear(&progress_path)?;
            CatalogStore::new()
        } else {
            checkpoint.load()?
        };

        let mut ledger = ProgressLedger::open(&progress_path)?;

        if !store.is_empty() && !ledger.has_processed_file() {
            let restored = ledger.reconstruct_processed(store.source_urls())?;
            tracing::info!(
                "Rebuilt progress ledger from {}: {} URLs",
                checkpoint.csv_path().display(),
                restored
            );
        } else {
            let dropped = ledger.retain_processed(|url| store.contains_url(url));
            if dropped > 0 {
                tracing::warn!(
                    "{} processed URLs have no catalog row; they will be processed again",
                    dropped
                );
            }

            let added = ledger.backfill_processed(store.source_urls())?;
            if added > 0 {
                tracing::warn!(
                    "{} catalog rows were missing from the progress ledger; marked as processed",
                    added
                );
            }
        }

        Ok(Self {
            config,
            fetcher,
            checkpoint,
            store,
            ledger,
            cancel,
            phase: RunPhase::Enumerating,
        })
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    /// Runs the crawl to completion
    ///
    /// Always ends with a checkpoint, whether the run finished, hit the
    /// limit, was cancelled or failed. A fatal error is returned after that
    /// final checkpoint has been attempted. A coordinator runs once; calling
    /// `run` again returns `DexError::InvalidTransition`.
    pub async fn run(&mut self, stats: &mut RunStats) -> Result<(), DexError> {
        if self.phase.is_terminal() {
            return Err(DexError::InvalidTransition {
                from: self.phase,
                to: RunPhase::FetchingNext,
            });
        }

        stats.existing_entries = self.store.len();
        stats.collection = CollectionStats::from_entries(self.store.entries());
        if !self.store.is_empty() {
            tracing::info!("Resuming with {} entries in the catalog", self.store.len());
        }

        let outcome = self.crawl(stats).await;
        if let Err(e) = &outcome {
            tracing::error!("Run stopped: {}", e);
        }

        self.transition(RunPhase::Checkpointing)?;
        let flushed = self.flush();
        self.transition(RunPhase::Done)?;

        stats.catalog_size = self.store.len();
        stats.total_rejected = self.ledger.rejected_count();

        match (outcome, flushed) {
            (Ok(()), Ok(())) => {
                tracing::info!(
                    "Saved {} entries to {} and {}",
                    self.store.len(),
                    self.checkpoint.csv_path().display(),
                    self.checkpoint.json_path().display()
                );
                Ok(())
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), Ok(())) => {
                tracing::info!("Progress saved: {} entries", self.store.len());
                Err(e)
            }
            (Err(e), Err(flush_err)) => {
                tracing::error!("Final checkpoint failed: {}", flush_err);
                Err(e)
            }
        }
    }

    async fn crawl(&mut self, stats: &mut RunStats) -> Result<(), DexError> {
        let index_url = self.config.index_url()?;
        let base_url = self.config.base_url()?;

        tracing::info!("Fetching index page {}", index_url);
        let index_html = self.fetcher.fetch(index_url.as_str(), stats).await?;
        let urls = extract_index_urls(&index_html, &base_url);
        stats.total_available = urls.len();

        let pending = urls.iter().filter(|u| !self.ledger.is_known(u)).count();
        let limit = self.config.crawler.entry_limit();
        tracing::info!(
            "Found {} candidate pages, {} not yet processed",
            urls.len(),
            pending
        );
        match limit {
            Some(limit) => tracing::info!("Collecting up to {} new entries", limit.min(pending)),
            None if pending == 0 => tracing::info!("Catalog is complete, nothing new to fetch"),
            None => {}
        }

        self.transition(RunPhase::FetchingNext)?;

        let batch_size = self.config.crawler.batch_size.max(1);
        let batch_delay = self.config.crawler.batch_delay();
        let mut in_batch = 0;
        let mut batch_number = 1;

        for url in &urls {
            if self.cancel.load(Ordering::SeqCst) {
                tracing::warn!("Stopping early; progress will be saved");
                stats.interrupted = true;
                break;
            }
            if self.ledger.is_known(url) {
                continue;
            }
            if limit.is_some_and(|limit| stats.new_entries >= limit) {
                tracing::info!("Reached the limit of {} new entries", stats.new_entries);
                stats.limit_reached = true;
                break;
            }

            let outcome = self.process_url(url, stats).await?;

            if outcome == RunPhase::Accepted {
                in_batch += 1;
                if in_batch >= batch_size {
                    self.transition(RunPhase::Checkpointing)?;
                    self.flush()?;
                    stats.batches_flushed += 1;
                    tracing::info!(
                        "Batch {} saved: {} entries in catalog",
                        batch_number,
                        self.store.len()
                    );
                    batch_number += 1;
                    in_batch = 0;

                    let more_allowed = !limit.is_some_and(|limit| stats.new_entries >= limit);
                    if more_allowed && !batch_delay.is_zero() {
                        tracing::debug!("Pausing {:?} between batches", batch_delay);
                        tokio::time::sleep(batch_delay).await;
                    }
                }
            }

            self.transition(RunPhase::FetchingNext)?;
        }

        Ok(())
    }

    /// Fetches and classifies one URL, updating catalog, ledger and stats
    ///
    /// Returns the page outcome phase. Page-level fetch failures are counted
    /// and leave the URL unmarked; storage failures are returned.
    async fn process_url(&mut self, url: &str, stats: &mut RunStats) -> Result<RunPhase, DexError> {
        tracing::debug!("Processing URL: {}", url);

        let bytes = match self.fetcher.fetch(url, stats).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_page_level() => {
                stats.errors += 1;
                tracing::error!("Problem with {}: {}", page_slug(url), e);
                self.transition(RunPhase::NetworkFailed)?;
                return Ok(RunPhase::NetworkFailed);
            }
            Err(e) => return Err(e),
        };

        let page = extract_page(&bytes, url);
        let label = page
            .name
            .clone()
            .unwrap_or_else(|| page_slug(url).to_string());

        match page.into_entry() {
            Ok(entry) => {
                if self.store.contains_url(url) {
                    tracing::debug!("{} is already in the catalog", label);
                } else {
                    stats.collection.track(&entry);
                    self.store.push(entry);
                    stats.new_entries += 1;
                    tracing::info!("Caught {} (#{})", label, self.store.len());
                }
                self.ledger.mark_processed(url)?;
                self.transition(RunPhase::Accepted)?;
                Ok(RunPhase::Accepted)
            }
            Err(reason) => {
                tracing::info!("Skipped {}: {}", label, reason);
                self.ledger.mark_rejected(url)?;
                stats.rejected += 1;
                self.transition(RunPhase::Rejected)?;
                Ok(RunPhase::Rejected)
            }
        }
    }

    fn flush(&mut self) -> Result<(), DexError> {
        self.checkpoint.flush(&self.store)?;
        self.ledger.sync()?;
        Ok(())
    }

    fn transition(&mut self, next: RunPhase) -> Result<(), DexError> {
        if !self.phase.can_transition_to(next) {
            return Err(DexError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::trace!("Phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }
}

/// What a run would do, computed without network access or writes
#[derive(Debug, Clone)]
pub struct RunPreview {
    pub index_url: Url,
    pub catalog_entries: usize,
    pub processed: usize,
    pub rejected: usize,
    pub cache_dir: PathBuf,
    /// Pages in the cache, if the cache directory exists
    pub cached_pages: Option<usize>,
    /// URLs still to process, if the index page is cached
    pub pending: Option<usize>,
}

/// Inspects checkpoint, ledger and cache for a dry run
///
/// Nothing is created, deleted or fetched. In rebuild mode the existing
/// ledger is reported as it would be before being cleared.
pub fn preview_run(config: &Config) -> Result<RunPreview, DexError> {
    let index_url = config.index_url()?;
    let base_url = config.base_url()?;
    let checkpoint = Checkpoint::new(&config.output.csv_path, &config.output.json_path);

    let store = checkpoint.load()?;
    let ledger = ProgressLedger::open(&config.output.progress_file)?;
    let cache = ContentCache::existing(&config.output.cache_dir);

    let cached_pages = match &cache {
        Some(cache) => Some(cache.len()?),
        None => None,
    };

    let pending = match &cache {
        Some(cache) if !config.crawler.rebuild => cache.get(index_url.as_str())?.map(|html| {
            extract_index_urls(&html, &base_url)
                .iter()
                .filter(|url| !ledger.is_known(url))
                .count()
        }),
        _ => None,
    };

    Ok(RunPreview {
        index_url,
        catalog_entries: store.len(),
        processed: ledger.processed_count(),
        rejected: ledger.rejected_count(),
        cache_dir: config.output.cache_dir.clone(),
        cached_pages,
        pending,
    })
}

/// Runs a complete crawl with the given configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::atomic::AtomicBool;
/// use std::sync::Arc;
/// use wikidex::config::load_config;
/// use wikidex::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("wikidex.toml"))?;
/// let stats = run_crawl(config, Arc::new(AtomicBool::new(false))).await?;
/// println!("{} new entries", stats.new_entries);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, cancel: Arc<AtomicBool>) -> Result<RunStats, DexError> {
    let mut coordinator = Coordinator::new(config, cancel)?;
    let mut stats = RunStats::new();
    coordinator.run(&mut stats).await?;
    Ok(stats)
}
