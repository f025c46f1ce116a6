//! Configuration module for Wikidex
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! All sections are optional, so an empty file (or no file at all) yields the
//! defaults for the Squishmallows wiki.
//!
//! # Example
//!
//! ```no_run
//! use wikidex::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("wikidex.toml")).unwrap();
//! println!("Checkpoint every {} entries", config.crawler.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

use crate::ConfigError;
use url::Url;

impl Config {
    /// Validates the configuration, e.g. after CLI overrides were applied
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self)
    }

    /// Absolute URL of the index page
    pub fn index_url(&self) -> Result<Url, ConfigError> {
        let base = self.base_url()?;
        base.join(&self.source.index_path).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid index path '{}': {}",
                self.source.index_path, e
            ))
        })
    }

    /// Parsed base URL of the wiki
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.source.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", self.source.base_url, e))
        })
    }
}
