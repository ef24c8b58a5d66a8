//! Persistence contract for the cached snapshot.
//!
//! A store holds at most one generation of rows. `replace_all` is a delete of
//! every row followed by an insert of the new rows; the two steps are separate
//! operations, so a failure between them leaves the store empty until the next
//! successful refresh.

pub mod memory;
pub mod rest;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::{CacheRecord, Snapshot, UtcDateTime};

pub use memory::MemorySnapshotStore;
pub use rest::RestSnapshotStore;

/// Store operation failure, tagged with the step that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("select failed: {0}")]
    Select(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("insert failed: {0}")]
    Insert(String),
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Backing store for the top-N snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Current rows ordered by rank ascending, at most [`crate::SNAPSHOT_LIMIT`].
    fn read_snapshot(&self) -> StoreFuture<'_, Vec<CacheRecord>>;

    /// Deletes every row, then inserts `snapshot` stamped with `updated_at`.
    fn replace_all<'a>(
        &'a self,
        snapshot: &'a Snapshot,
        updated_at: UtcDateTime,
    ) -> StoreFuture<'a, ()>;
}
