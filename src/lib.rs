//! Wikidex: a polite, resumable catalog builder
//!
//! This crate crawls a wiki index page, follows every per-entry link, extracts
//! structured fields from each leaf page and keeps a durable, resumable catalog
//! of the results (CSV + JSON checkpoints, an append-only progress ledger and a
//! content-addressed page cache).

pub mod cache;
pub mod catalog;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod ledger;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Wikidex operations
#[derive(Debug, Error)]
pub enum DexError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error for {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunPhase,
        to: state::RunPhase,
    },
}

impl DexError {
    /// Returns true for failures scoped to a single page fetch.
    ///
    /// These are logged and the URL is left unmarked so the next run retries
    /// it; every other error ends the run.
    pub fn is_page_level(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Status { .. } | Self::Timeout { .. }
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Wikidex operations
pub type Result<T> = std::result::Result<T, DexError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{CatalogEntry, CatalogStore};
pub use config::Config;
pub use ledger::{LedgerStatus, ProgressLedger};
pub use output::RunStats;
pub use state::RunPhase;
