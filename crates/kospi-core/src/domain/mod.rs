//! Domain models for the ranking snapshot.

pub mod models;
pub mod timestamp;

pub use models::{CacheRecord, Snapshot, StockRow, MAX_RANK, SNAPSHOT_LIMIT};
pub use timestamp::UtcDateTime;
