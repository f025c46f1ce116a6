//! Polite HTTP fetcher
//!
//! This module handles every request the crawler makes:
//! - Building the HTTP client with the configured user agent and timeout
//! - Serving pages from the content cache when possible
//! - Fetching misses from the network and caching the response
//! - Waiting the configured delay after each network request
//! - Error classification (status, timeout, transport)

use crate::cache::ContentCache;
use crate::config::Config;
use crate::output::RunStats;
use crate::url::page_slug;
use crate::DexError;
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The run configuration (user agent and page timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use wikidex::config::Config;
/// use wikidex::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (contact)
    let user_agent = config.user_agent.header_value();
    let timeout = config.crawler.page_timeout();

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Cache-first fetcher with a fixed delay after every network request
///
/// Cache hits return immediately. Misses cost exactly one request followed
/// by `request_delay`, whether the request succeeded or not, so consecutive
/// requests to the origin are always at least that far apart.
#[derive(Debug, Clone)]
pub struct PoliteFetcher {
    client: Client,
    cache: ContentCache,
    request_delay: Duration,
    refresh: bool,
}

impl PoliteFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for cache misses
    /// * `cache` - Content cache consulted before the network
    /// * `request_delay` - Pause after each network request
    /// * `refresh` - Skip cache reads (responses are still written)
    pub fn new(client: Client, cache: ContentCache, request_delay: Duration, refresh: bool) -> Self {
        Self {
            client,
            cache,
            request_delay,
            refresh,
        }
    }

    /// Creates a fetcher from the run configuration, opening the cache
    pub fn from_config(config: &Config) -> Result<Self, DexError> {
        let client = build_http_client(config)?;
        let cache = ContentCache::open(&config.output.cache_dir)?;

        Ok(Self::new(
            client,
            cache,
            config.crawler.request_delay(),
            config.crawler.refresh,
        ))
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Returns the bytes for `url`, from cache or network
    ///
    /// # Request Flow
    ///
    /// 1. Unless refreshing, return the cached copy if there is one
    /// 2. Send one GET request
    /// 3. Cache the body of a 2xx response
    /// 4. Sleep `request_delay`
    ///
    /// # Errors
    ///
    /// | Condition | Error |
    /// |-----------|-------|
    /// | Non-2xx status | `DexError::Status` |
    /// | Request timed out | `DexError::Timeout` |
    /// | Connection or body failure | `DexError::Network` |
    /// | Cache read/write failure | `DexError::Storage` |
    pub async fn fetch(&self, url: &str, stats: &mut RunStats) -> Result<Vec<u8>, DexError> {
        if !self.refresh {
            if let Some(bytes) = self.cache.get(url)? {
                stats.cache_hits += 1;
                tracing::debug!("Cache hit: {}", page_slug(url));
                return Ok(bytes);
            }
            stats.cache_misses += 1;
            tracing::debug!("Cache miss: {}", page_slug(url));
        }

        tracing::debug!("Fetching {}", url);
        stats.network_requests += 1;
        let result = self.download(url).await;

        if let Ok(bytes) = &result {
            self.cache.put(url, bytes)?;
            tracing::debug!("Saved {} bytes to cache", bytes.len());
        }

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        result
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, DexError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DexError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_error(url, e))?;
        Ok(body.to_vec())
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> DexError {
    if error.is_timeout() {
        DexError::Timeout {
            url: url.to_string(),
        }
    } else {
        DexError::Network {
            url: url.to_string(),
            source: error,
        }
    }
}
