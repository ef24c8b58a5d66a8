//! # Kospi Warehouse
//!
//! `DuckDB`-backed persistence for the cached top-10 snapshot.
//!
//! The table mirrors [`kospi_core::CacheRecord`]: one row per ranked company,
//! all rows of a generation sharing the same `updated_at`. Writes are a plain
//! delete followed by a transactional bulk insert; see [`Warehouse::replace_all`].
//!
//! ```rust,no_run
//! use kospi_warehouse::{Warehouse, WarehouseConfig};
//!
//! let warehouse = Warehouse::open(WarehouseConfig::default())?;
//! for record in warehouse.read_snapshot()? {
//!     println!("{} {}", record.row.rank, record.row.company_name);
//! }
//! # Ok::<(), kospi_warehouse::WarehouseError>(())
//! ```

pub mod duckdb;
pub mod migrations;
pub mod store;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use kospi_core::{CacheRecord, Snapshot, StockRow, UtcDateTime, ValidationError, SNAPSHOT_LIMIT};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};
pub use store::DuckDbSnapshotStore;

const TABLE: &str = "kospi_top10_cache";

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A stored row no longer satisfies the domain rules.
    #[error("invalid stored row: {0}")]
    InvalidData(#[from] ValidationError),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            db_path: resolve_kospi_home().join("cache").join("top10.duckdb"),
            max_pool_size: 4,
        }
    }
}

/// Snapshot table on an embedded `DuckDB` file.
#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Opens (creating if needed) the database and applies migrations.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path, config.max_pool_size)?;
        let connection = manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        drop(connection);

        Ok(Self { manager })
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Current rows ordered by rank, at most [`SNAPSHOT_LIMIT`].
    pub fn read_snapshot(&self) -> Result<Vec<CacheRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let sql = format!(
            "SELECT id, \"rank\", stock_code, company_name, price, change, change_pct, updated_at \
             FROM {TABLE} ORDER BY \"rank\" ASC, seq ASC LIMIT {SNAPSHOT_LIMIT}"
        );
        let mut statement = connection.prepare(&sql)?;
        let raw_rows = statement.query_map([], |row| {
            Ok(RawRecord {
                id: row.get(0)?,
                rank: row.get(1)?,
                stock_code: row.get(2)?,
                company_name: row.get(3)?,
                price: row.get(4)?,
                change: row.get(5)?,
                change_pct: row.get(6)?,
                updated_at: row.get(7)?,
            })
        })?;

        let mut records = Vec::new();
        for raw in raw_rows {
            records.push(raw?.into_record()?);
        }
        Ok(records)
    }

    /// Deletes every cached row.
    pub fn delete_all(&self) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        let deleted = connection.execute(&format!("DELETE FROM {TABLE} WHERE \"rank\" >= 1"), [])?;
        info!(target: "kospi::store", deleted, "deleted cached rows");
        Ok(deleted)
    }

    /// Inserts `snapshot` as one generation stamped with `updated_at`.
    ///
    /// The insert is a single transaction: either every row lands or none does.
    pub fn insert_all(
        &self,
        snapshot: &Snapshot,
        updated_at: UtcDateTime,
    ) -> Result<(), WarehouseError> {
        if snapshot.is_empty() {
            return Ok(());
        }

        let updated_at_text = updated_at.format_rfc3339();
        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for (seq, row) in snapshot.rows().iter().enumerate() {
                let id = Uuid::new_v4().to_string();
                let rank = i64::from(row.rank);
                let seq = seq as i64;
                let price = i64::try_from(row.price).map_err(|_| ValidationError::NegativeValue {
                    field: "price",
                })?;
                let params: [&dyn ToSql; 9] = [
                    &id,
                    &rank,
                    &seq,
                    &row.stock_code,
                    &row.company_name,
                    &price,
                    &row.change,
                    &row.change_pct,
                    &updated_at_text,
                ];
                connection.execute(
                    &format!(
                        "INSERT INTO {TABLE} \
                         (id, \"rank\", seq, stock_code, company_name, price, change, change_pct, updated_at) \
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
                    ),
                    params.as_slice(),
                )?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)?;
        info!(
            target: "kospi::store",
            rows = snapshot.len(),
            updated_at = %updated_at_text,
            "snapshot stored"
        );
        Ok(())
    }

    /// Delete-then-insert. The two steps are not one transaction.
    pub fn replace_all(
        &self,
        snapshot: &Snapshot,
        updated_at: UtcDateTime,
    ) -> Result<(), WarehouseError> {
        self.delete_all()?;
        self.insert_all(snapshot, updated_at)
    }
}

struct RawRecord {
    id: String,
    rank: i64,
    stock_code: String,
    company_name: String,
    price: i64,
    change: i64,
    change_pct: f64,
    updated_at: String,
}

impl RawRecord {
    fn into_record(self) -> Result<CacheRecord, ValidationError> {
        let rank = u32::try_from(self.rank).map_err(|_| ValidationError::RankOutOfRange {
            rank: self.rank,
            max: kospi_core::MAX_RANK,
        })?;
        let price = u64::try_from(self.price)
            .map_err(|_| ValidationError::NegativeValue { field: "price" })?;
        let row = StockRow {
            rank,
            stock_code: self.stock_code,
            company_name: self.company_name,
            price,
            change: self.change,
            change_pct: self.change_pct,
        };
        row.validate()?;

        Ok(CacheRecord::new(
            self.id,
            row,
            UtcDateTime::parse(&self.updated_at)?,
        ))
    }
}

/// Commits on success, rolls back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn resolve_kospi_home() -> PathBuf {
    if let Some(path) = env::var_os("KOSPI_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".kospi");
    }

    PathBuf::from(".kospi")
}
