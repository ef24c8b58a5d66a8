use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SnapshotStore, StoreError, StoreFuture};
use crate::{CacheRecord, Snapshot, UtcDateTime, SNAPSHOT_LIMIT};

/// Process-local store. Contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    records: Arc<RwLock<Vec<CacheRecord>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delete_all(&self) {
        self.records.write().await.clear();
    }

    pub async fn insert_all(&self, snapshot: &Snapshot, updated_at: UtcDateTime) {
        let mut records = self.records.write().await;
        records.extend(snapshot.rows().iter().map(|row| {
            CacheRecord::new(Uuid::new_v4().to_string(), row.clone(), updated_at)
        }));
    }

    /// Number of stored rows, including any beyond the read limit.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read_snapshot(&self) -> StoreFuture<'_, Vec<CacheRecord>> {
        Box::pin(async move {
            let mut records = self.records.read().await.clone();
            // Stable sort keeps insertion order among equal ranks.
            records.sort_by_key(|record| record.row.rank);
            records.truncate(SNAPSHOT_LIMIT);
            Ok::<_, StoreError>(records)
        })
    }

    fn replace_all<'a>(
        &'a self,
        snapshot: &'a Snapshot,
        updated_at: UtcDateTime,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.delete_all().await;
            self.insert_all(snapshot, updated_at).await;
            Ok(())
        })
    }
}
