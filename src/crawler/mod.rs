//! Crawler module for fetching and processing wiki pages
//!
//! This module contains the core crawling logic, including:
//! - Cache-first HTTP fetching with a politeness delay
//! - Index page parsing
//! - Overall run coordination (batches, checkpoints, resume)

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{preview_run, run_crawl, Coordinator, RunPreview};
pub use fetcher::{build_http_client, PoliteFetcher};
pub use parser::extract_index_urls;
