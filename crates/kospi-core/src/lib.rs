//! # Kospi Core
//!
//! Scrape, parse, and cache pipeline for the KOSPI market-cap top 10.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`crawler`] | Upstream fetch and EUC-KR decoding |
//! | [`parser`] | Ranking table extraction and sign derivation |
//! | [`freshness`] | TTL gate for the cached snapshot |
//! | [`store`] | Snapshot store contract plus memory and REST backends |
//! | [`service`] | Request handler tying the pieces together |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`config`] | Runtime configuration |
//! | [`domain`] | Stock rows, snapshots, cache records |
//! | [`format`] | Display helpers for prices, changes, and KST times |
//!
//! ## Architecture
//!
//! ```text
//!  request ─▶ StockService ─▶ SnapshotStore::read_snapshot ─▶ fresh? ─▶ cache
//!                  │
//!                  └─▶ Crawler (fetch ─▶ decode ─▶ parse) ─▶ replace_all ─▶ re-read ─▶ crawl
//! ```

pub mod config;
pub mod crawler;
pub mod domain;
pub mod error;
pub mod format;
pub mod freshness;
pub mod http_client;
pub mod parser;
pub mod service;
pub mod store;

pub use config::{CacheConfig, CrawlerConfig, RestStoreConfig};
pub use crawler::{Crawler, FetchError};
pub use domain::{CacheRecord, Snapshot, StockRow, UtcDateTime, MAX_RANK, SNAPSHOT_LIMIT};
pub use error::{ConfigError, ValidationError};
pub use freshness::is_fresh;
pub use http_client::{
    FixtureHttpClient, HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};
pub use parser::{derive_sign, parse_ranking_table, Direction};
pub use service::{Provenance, ServiceError, StockService, StocksPayload};
pub use store::{MemorySnapshotStore, RestSnapshotStore, SnapshotStore, StoreError, StoreFuture};
