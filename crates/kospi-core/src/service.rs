//! Read path: serve the cached snapshot while fresh, otherwise crawl and store.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use time::Duration;
use tracing::{info, warn};

use crate::crawler::{Crawler, FetchError};
use crate::freshness::is_fresh;
use crate::store::{SnapshotStore, StoreError};
use crate::{CacheRecord, UtcDateTime};

/// Where the served rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Cache,
    Crawl,
}

/// Successful response body: `{ "data": [...], "source": "cache" | "crawl" }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StocksPayload {
    pub data: Vec<CacheRecord>,
    pub source: Provenance,
}

/// Failure during a refresh.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("[crawl] {0}")]
    Fetch(#[from] FetchError),

    #[error("[db] {0}")]
    Store(#[from] StoreError),
}

/// Orchestrates the freshness gate, the crawler, and the store.
///
/// There is no cross-request locking: concurrent stale reads each run their
/// own refresh and the last writer's rows persist.
#[derive(Clone)]
pub struct StockService {
    store: Arc<dyn SnapshotStore>,
    crawler: Crawler,
    ttl: Duration,
}

impl StockService {
    pub fn new(store: Arc<dyn SnapshotStore>, crawler: Crawler, ttl: Duration) -> Self {
        Self {
            store,
            crawler,
            ttl,
        }
    }

    pub async fn load(&self) -> Result<StocksPayload, ServiceError> {
        let started = Instant::now();

        if let Some(data) = self.check_cache().await {
            info!(
                target: "kospi::api",
                elapsed_ms = started.elapsed().as_millis() as u64,
                rows = data.len(),
                "served from cache"
            );
            return Ok(StocksPayload {
                data,
                source: Provenance::Cache,
            });
        }

        let data = self.refresh().await?;
        info!(
            target: "kospi::api",
            elapsed_ms = started.elapsed().as_millis() as u64,
            rows = data.len(),
            "served from crawl"
        );
        Ok(StocksPayload {
            data,
            source: Provenance::Crawl,
        })
    }

    /// Returns the cached rows if present and fresh. Read failures count as a miss.
    async fn check_cache(&self) -> Option<Vec<CacheRecord>> {
        let cached = match self.store.read_snapshot().await {
            Ok(cached) => cached,
            Err(error) => {
                warn!(target: "kospi::api", %error, "cache read failed");
                return None;
            }
        };

        let Some(first) = cached.first() else {
            info!(target: "kospi::api", "cache empty, crawling");
            return None;
        };

        let now = UtcDateTime::now();
        let age_secs = first.updated_at.age_at(now).whole_seconds();
        if is_fresh(first.updated_at, now, self.ttl) {
            info!(target: "kospi::api", age_secs, "cache hit");
            Some(cached)
        } else {
            info!(target: "kospi::api", age_secs, "cache expired, crawling");
            None
        }
    }

    async fn refresh(&self) -> Result<Vec<CacheRecord>, ServiceError> {
        let snapshot = self.crawler.crawl().await?;
        self.store.replace_all(&snapshot, UtcDateTime::now()).await?;
        // Re-read for store-assigned ids and the persisted timestamp.
        Ok(self.store.read_snapshot().await?)
    }
}
