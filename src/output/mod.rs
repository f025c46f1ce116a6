//! Output module for run statistics and printed reports
//!
//! This module handles:
//! - The per-run stats handle threaded through fetcher and coordinator
//! - Attribute tallies over the catalog
//! - End-of-run and `--stats` summaries

pub mod stats;

pub use stats::{print_collection_stats, print_run_summary, CollectionStats, RunStats};
