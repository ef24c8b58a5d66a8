//! Runtime configuration for the crawler, the cache gate, and the REST store.

use time::Duration;

use crate::ConfigError;

/// Market-cap ranking, KOSPI (`sosok=0`), first page.
pub const DEFAULT_SOURCE_URL: &str =
    "https://finance.naver.com/sise/sise_market_sum.nhn?sosok=0&page=1";

/// The upstream rejects clients that do not look like a browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

pub const DEFAULT_TABLE: &str = "kospi_top10_cache";

/// Upstream fetch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerConfig {
    pub source_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            source_url: String::from(DEFAULT_SOURCE_URL),
            user_agent: String::from(DEFAULT_USER_AGENT),
            timeout_ms: 10_000,
        }
    }
}

/// Freshness settings for the cached snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(10),
        }
    }
}

/// Connection parameters for a PostgREST-compatible store.
#[derive(Clone, PartialEq, Eq)]
pub struct RestStoreConfig {
    pub endpoint: String,
    pub api_key: String,
    pub table: String,
}

impl RestStoreConfig {
    /// Builds the config from externally supplied values; blank counts as missing.
    pub fn from_parts(
        endpoint: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        let endpoint = endpoint
            .map(|value| value.trim().trim_end_matches('/').to_owned())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingEndpoint)?;
        let api_key = api_key
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingAccessKey)?;

        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ConfigError::InvalidEndpoint { value: endpoint });
        }

        Ok(Self {
            endpoint,
            api_key,
            table: String::from(DEFAULT_TABLE),
        })
    }
}

// Keep the key out of debug logs.
impl std::fmt::Debug for RestStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStoreConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("table", &self.table)
            .finish()
    }
}
