//! PostgREST-dialect store, as exposed by hosted Postgres gateways.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{SnapshotStore, StoreError, StoreFuture};
use crate::config::RestStoreConfig;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};
use crate::{CacheRecord, Snapshot, StockRow, UtcDateTime, SNAPSHOT_LIMIT};

/// Row shape sent on insert; identity is assigned by the store.
#[derive(Debug, Serialize)]
struct NewRecord<'a> {
    #[serde(flatten)]
    row: &'a StockRow,
    updated_at: UtcDateTime,
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    message: String,
}

/// Snapshot store talking to `{endpoint}/rest/v1/{table}`.
#[derive(Clone)]
pub struct RestSnapshotStore {
    http: Arc<dyn HttpClient>,
    config: RestStoreConfig,
    auth: HttpAuth,
}

impl RestSnapshotStore {
    pub fn new(http: Arc<dyn HttpClient>, config: RestStoreConfig) -> Self {
        let auth = HttpAuth::api_key(config.api_key.as_str());
        Self { http, config, auth }
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.endpoint,
            urlencoding::encode(&self.config.table)
        )
    }

    async fn select(&self) -> Result<Vec<CacheRecord>, StoreError> {
        let url = format!(
            "{}?select=*&order=rank.asc&limit={SNAPSHOT_LIMIT}",
            self.table_url()
        );
        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_auth(&self.auth);

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| StoreError::Select(e.to_string()))?;
        if !response.is_success() {
            return Err(StoreError::Select(gateway_message(&response)));
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| StoreError::Select(format!("unexpected payload: {e}")))
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        info!(target: "kospi::store", table = %self.config.table, "deleting cached rows");
        let request = HttpRequest::delete(format!("{}?rank=gte.1", self.table_url()))
            .with_auth(&self.auth);

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| StoreError::Delete(e.to_string()))?;
        if !response.is_success() {
            return Err(StoreError::Delete(gateway_message(&response)));
        }
        Ok(())
    }

    async fn insert_all(&self, snapshot: &Snapshot, updated_at: UtcDateTime) -> Result<(), StoreError> {
        if snapshot.is_empty() {
            info!(target: "kospi::store", "nothing to insert");
            return Ok(());
        }

        let rows: Vec<NewRecord<'_>> = snapshot
            .rows()
            .iter()
            .map(|row| NewRecord { row, updated_at })
            .collect();
        let body = serde_json::to_string(&rows)
            .map_err(|e| StoreError::Insert(format!("failed to encode rows: {e}")))?;

        info!(target: "kospi::store", rows = rows.len(), "inserting rows");
        let request = HttpRequest::post(self.table_url())
            .with_header("content-type", "application/json")
            .with_header("prefer", "return=minimal")
            .with_auth(&self.auth)
            .with_body(body);

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| StoreError::Insert(e.to_string()))?;
        if !response.is_success() {
            return Err(StoreError::Insert(gateway_message(&response)));
        }

        info!(target: "kospi::store", %updated_at, "snapshot stored");
        Ok(())
    }
}

impl SnapshotStore for RestSnapshotStore {
    fn read_snapshot(&self) -> StoreFuture<'_, Vec<CacheRecord>> {
        Box::pin(self.select())
    }

    fn replace_all<'a>(
        &'a self,
        snapshot: &'a Snapshot,
        updated_at: UtcDateTime,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.delete_all().await?;
            self.insert_all(snapshot, updated_at).await
        })
    }
}

/// Prefers the gateway's `{"message": ...}` body over the raw text.
fn gateway_message(response: &HttpResponse) -> String {
    let detail = serde_json::from_slice::<GatewayError>(&response.body)
        .map(|error| error.message)
        .unwrap_or_else(|_| response.text().trim().to_owned());
    format!("HTTP {}: {detail}", response.status)
}
