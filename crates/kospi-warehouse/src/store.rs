//! [`SnapshotStore`] adapter running warehouse calls on the blocking pool.

use kospi_core::{CacheRecord, Snapshot, SnapshotStore, StoreError, StoreFuture, UtcDateTime};
use tokio::task;

use crate::{Warehouse, WarehouseError};

#[derive(Clone)]
pub struct DuckDbSnapshotStore {
    warehouse: Warehouse,
}

impl DuckDbSnapshotStore {
    pub fn new(warehouse: Warehouse) -> Self {
        Self { warehouse }
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }
}

/// Runs `op` off the async runtime and tags failures with `wrap`.
async fn blocking<T, F>(
    warehouse: &Warehouse,
    wrap: fn(String) -> StoreError,
    op: F,
) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&Warehouse) -> Result<T, WarehouseError> + Send + 'static,
{
    let warehouse = warehouse.clone();
    task::spawn_blocking(move || op(&warehouse))
        .await
        .map_err(|e| wrap(format!("storage task failed: {e}")))?
        .map_err(|e| wrap(e.to_string()))
}

impl SnapshotStore for DuckDbSnapshotStore {
    fn read_snapshot(&self) -> StoreFuture<'_, Vec<CacheRecord>> {
        Box::pin(blocking(&self.warehouse, StoreError::Select, |warehouse| {
            warehouse.read_snapshot()
        }))
    }

    fn replace_all<'a>(
        &'a self,
        snapshot: &'a Snapshot,
        updated_at: UtcDateTime,
    ) -> StoreFuture<'a, ()> {
        let snapshot = snapshot.clone();
        Box::pin(async move {
            blocking(&self.warehouse, StoreError::Delete, |warehouse| {
                warehouse.delete_all().map(|_| ())
            })
            .await?;
            blocking(&self.warehouse, StoreError::Insert, move |warehouse| {
                warehouse.insert_all(&snapshot, updated_at)
            })
            .await
        })
    }
}
