//! Run and collection statistics
//!
//! [`RunStats`] is the per-run handle passed explicitly to the fetcher and the
//! coordinator; nothing here is global. [`CollectionStats`] tallies attribute
//! values over catalog entries for the end-of-run and `--stats` reports.

use crate::catalog::CatalogEntry;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

/// Counters for a single run
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Entries accepted this run
    pub new_entries: usize,

    /// Pages classified as non-entries this run
    pub rejected: usize,

    /// Pages that failed to fetch this run (left for the next run)
    pub errors: usize,

    pub cache_hits: usize,
    pub cache_misses: usize,

    /// Requests actually sent to the origin
    pub network_requests: usize,

    /// Checkpoints written at batch boundaries (the final one is not counted)
    pub batches_flushed: usize,

    /// Catalog size when the run started
    pub existing_entries: usize,

    /// Candidate URLs listed on the index page
    pub total_available: usize,

    /// Size of the rejected ledger at the end of the run
    pub total_rejected: usize,

    /// Catalog size at the end of the run
    pub catalog_size: usize,

    /// Run stopped early on operator request
    pub interrupted: bool,

    /// Run stopped early because the entry limit was reached
    pub limit_reached: bool,

    pub started_at: DateTime<Utc>,

    /// Attribute tallies over the whole catalog
    pub collection: CollectionStats,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            new_entries: 0,
            rejected: 0,
            errors: 0,
            cache_hits: 0,
            cache_misses: 0,
            network_requests: 0,
            batches_flushed: 0,
            existing_entries: 0,
            total_available: 0,
            total_rejected: 0,
            catalog_size: 0,
            interrupted: false,
            limit_reached: false,
            started_at: Utc::now(),
            collection: CollectionStats::default(),
        }
    }

    /// Wall-clock time since the run started
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }

    /// Percentage of index entries now in the catalog
    ///
    /// Rejected pages are not counted as available. Returns `None` before the
    /// index page has been read.
    pub fn completion(&self) -> Option<f64> {
        if self.total_available == 0 {
            return None;
        }
        let valid = self.total_available.saturating_sub(self.total_rejected);
        if valid == 0 {
            return Some(100.0);
        }
        Some((self.catalog_size as f64 / valid as f64 * 100.0).min(100.0))
    }

    /// Candidate entries still missing from the catalog
    pub fn remaining(&self) -> usize {
        self.total_available
            .saturating_sub(self.total_rejected)
            .saturating_sub(self.catalog_size)
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Value tallies over a set of catalog entries
#[derive(Debug, Clone, Default)]
pub struct CollectionStats {
    pub total: usize,
    pub types: HashMap<String, usize>,
    pub colors: HashMap<String, usize>,
    pub squads: HashMap<String, usize>,
    pub sizes: HashMap<String, usize>,
    pub years: HashMap<String, usize>,

    /// Uppercased first letters of names
    pub letters: BTreeSet<char>,

    pub longest_name: Option<String>,
    pub shortest_name: Option<String>,
}

impl CollectionStats {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a CatalogEntry>) -> Self {
        let mut stats = Self::default();
        for entry in entries {
            stats.track(entry);
        }
        stats
    }

    /// Adds one entry to the tallies
    ///
    /// Sizes are comma-separated on the wiki and each one is counted.
    pub fn track(&mut self, entry: &CatalogEntry) {
        self.total += 1;

        bump(&mut self.types, entry.attribute("Type"));
        bump(&mut self.colors, entry.attribute("Color"));
        bump(&mut self.squads, entry.attribute("Squad"));
        bump(&mut self.years, entry.attribute("Year"));
        if let Some(sizes) = entry.attribute("Size(s)") {
            for size in sizes.split(',') {
                bump(&mut self.sizes, Some(size));
            }
        }

        let name = entry.name.trim();
        if let Some(first) = name.chars().next().filter(|c| c.is_alphabetic()) {
            self.letters.extend(first.to_uppercase());
        }
        if !name.is_empty() {
            let len = name.chars().count();
            if self.longest_name.as_ref().map_or(true, |n| len > n.chars().count()) {
                self.longest_name = Some(name.to_string());
            }
            if self.shortest_name.as_ref().map_or(true, |n| len < n.chars().count()) {
                self.shortest_name = Some(name.to_string());
            }
        }
    }

    /// ASCII letters no name starts with
    pub fn missing_letters(&self) -> Vec<char> {
        ('A'..='Z').filter(|c| !self.letters.contains(c)).collect()
    }

    /// Earliest and latest year, compared as strings
    pub fn year_range(&self) -> Option<(&str, &str)> {
        let min = self.years.keys().min()?;
        let max = self.years.keys().max()?;
        Some((min.as_str(), max.as_str()))
    }
}

fn bump(counts: &mut HashMap<String, usize>, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
}

/// Highest count; ties go to the alphabetically first value
pub fn most_common(counts: &HashMap<String, usize>) -> Option<(&str, usize)> {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(k, v)| (k.as_str(), *v))
}

/// Lowest count; ties go to the alphabetically first value
pub fn least_common(counts: &HashMap<String, usize>) -> Option<(&str, usize)> {
    counts
        .iter()
        .min_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, v)| (k.as_str(), *v))
}

/// Prints the end-of-run summary to stdout
///
/// # Arguments
///
/// * `stats` - The finished run's counters
/// * `verbose` - Also show cache and network counters
pub fn print_run_summary(stats: &RunStats, verbose: bool) {
    let elapsed = stats.elapsed().num_seconds().max(0);

    println!("=== Run Summary ===\n");

    if stats.interrupted {
        println!("Stopped early on request; progress has been saved.\n");
    } else if stats.limit_reached {
        println!("Reached the entry limit for this run.\n");
    }

    println!("Run:");
    println!("  Total in catalog: {}", stats.catalog_size);
    println!("  New this run: {}", stats.new_entries);
    println!("  Already had: {}", stats.existing_entries);
    println!("  Rejected: {}", stats.rejected);
    if stats.errors > 0 {
        println!("  Errors: {} (will be retried next run)", stats.errors);
    }
    println!("  Time taken: {}m {}s", elapsed / 60, elapsed % 60);
    if verbose {
        println!("  Cache hits: {}", stats.cache_hits);
        println!("  Downloads: {}", stats.network_requests);
        println!("  Batches saved: {}", stats.batches_flushed);
    }
    println!();

    if let Some(pct) = stats.completion() {
        println!("Completion:");
        println!("  Progress: {:.1}%", pct);
        if stats.total_rejected > 0 {
            println!("  Non-entry pages: {}", stats.total_rejected);
        }
        match stats.remaining() {
            0 => println!("  Every listed entry is in the catalog"),
            n => println!("  Remaining: {}", n),
        }
        println!();
    }

    print_collection_stats(&stats.collection);
}

/// Prints attribute tallies to stdout
pub fn print_collection_stats(collection: &CollectionStats) {
    if collection.total == 0 {
        println!("The catalog is empty.");
        return;
    }

    println!("Collection ({} entries):", collection.total);
    println!("  Unique types: {}", collection.types.len());
    println!("  Unique colors: {}", collection.colors.len());
    println!("  Unique squads: {}", collection.squads.len());

    if !collection.letters.is_empty() {
        let missing = collection.missing_letters();
        let mut coverage = format!("{}/26 letters", 26 - missing.len());
        if missing.is_empty() {
            coverage.push_str(" (complete)");
        } else if missing.len() <= 5 {
            let missing: Vec<String> = missing.iter().map(char::to_string).collect();
            coverage.push_str(&format!(" (missing: {})", missing.join(", ")));
        }
        println!("  Alphabet coverage: {}", coverage);
    }
    println!();

    println!("Attributes:");
    if let Some((kind, count)) = most_common(&collection.types) {
        println!("  Most common type: {} ({})", kind, count);
        let rare = collection.types.values().filter(|c| **c == 1).count();
        if rare > 0 {
            println!("  Types seen once: {}", rare);
        }
    }
    if let (Some(top), Some(rare)) = (
        most_common(&collection.colors),
        least_common(&collection.colors),
    ) {
        println!("  Most common color: {} ({})", top.0, top.1);
        println!("  Rarest color: {} ({})", rare.0, rare.1);
    }
    if let (Some(big), Some(small)) = (
        most_common(&collection.squads),
        least_common(&collection.squads),
    ) {
        println!("  Biggest squad: {} ({})", big.0, big.1);
        println!("  Smallest squad: {} ({})", small.0, small.1);
    }
    if let Some((size, count)) = most_common(&collection.sizes) {
        println!("  Most common size: {} ({})", size, count);
        println!("  Size variety: {}", collection.sizes.len());
    }
    if let Some((first, last)) = collection.year_range() {
        println!("  Year range: {} - {}", first, last);
    }
    if let Some((year, count)) = most_common(&collection.years) {
        println!("  Most common year: {} ({})", year, count);
    }

    if let (Some(longest), Some(shortest)) = (&collection.longest_name, &collection.shortest_name) {
        println!();
        println!("Names:");
        println!("  Longest: {} ({} chars)", longest, longest.chars().count());
        println!("  Shortest: {} ({} chars)", shortest, shortest.chars().count());
    }
}
