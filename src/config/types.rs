use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Wikidex
///
/// Every section is optional in the TOML file; missing keys fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
}

/// Where the index page lives
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Scheme and host of the wiki, used to resolve `/wiki/...` links
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the page that links to every candidate entry
    #[serde(rename = "index-path")]
    pub index_path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://squishmallowsquad.fandom.com".to_string(),
            index_path: "/wiki/Master_List".to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// Free-form contact or purpose note appended in parentheses
    pub contact: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (contact)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} ({})",
            self.crawler_name, self.crawler_version, self.contact
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Wikidex".to_string(),
            crawler_version: "1.0".to_string(),
            contact: "personal use".to_string(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Pause after every genuine network fetch (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Extra pause after each checkpoint (milliseconds)
    #[serde(rename = "batch-delay-ms")]
    pub batch_delay_ms: u64,

    /// Checkpoint every N accepted entries
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Maximum number of new entries to accept this run (0 = unbounded)
    pub limit: usize,

    /// Per-request timeout (seconds)
    #[serde(rename = "page-timeout-secs")]
    pub page_timeout_secs: u64,

    /// Re-download every page even when it is cached
    pub refresh: bool,

    /// Clear the ledger and rebuild the catalog from scratch
    pub rebuild: bool,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    /// The limit as an option; `None` means no limit
    pub fn entry_limit(&self) -> Option<usize> {
        (self.limit > 0).then_some(self.limit)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 1200,
            batch_delay_ms: 5000,
            batch_size: 10,
            limit: 0,
            page_timeout_secs: 30,
            refresh: false,
            rebuild: false,
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding one file per fetched URL
    #[serde(rename = "cache-dir")]
    pub cache_dir: PathBuf,

    /// Ledger of processed URLs; the rejected ledger sits next to it
    #[serde(rename = "progress-file")]
    pub progress_file: PathBuf,

    /// Tabular checkpoint
    #[serde(rename = "csv-path")]
    pub csv_path: PathBuf,

    /// Document checkpoint
    #[serde(rename = "json-path")]
    pub json_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache_html"),
            progress_file: PathBuf::from("progress_urls.txt"),
            csv_path: PathBuf::from("wikidex.csv"),
            json_path: PathBuf::from("wikidex.json"),
        }
    }
}
