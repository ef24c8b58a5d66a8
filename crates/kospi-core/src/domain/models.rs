use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{UtcDateTime, ValidationError};

/// Highest rank admitted into a snapshot.
pub const MAX_RANK: u32 = 10;

/// Maximum number of rows in a snapshot and in a store read.
pub const SNAPSHOT_LIMIT: usize = 10;

/// One ranked company as scraped from the market-cap table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    pub rank: u32,
    pub stock_code: String,
    pub company_name: String,
    pub price: u64,
    pub change: i64,
    pub change_pct: f64,
}

impl StockRow {
    /// Checks the rank window shared by the parser and the stores.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rank == 0 || self.rank > MAX_RANK {
            return Err(ValidationError::RankOutOfRange {
                rank: i64::from(self.rank),
                max: MAX_RANK,
            });
        }
        Ok(())
    }
}

/// Ordered result of one parse pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    rows: Vec<StockRow>,
}

impl Snapshot {
    pub fn new(rows: Vec<StockRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[StockRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A persisted row: the stock fields plus store identity and refresh clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(flatten)]
    pub row: StockRow,
    pub updated_at: UtcDateTime,
}

impl CacheRecord {
    pub fn new(id: impl Into<String>, row: StockRow, updated_at: UtcDateTime) -> Self {
        Self {
            id: id.into(),
            row,
            updated_at,
        }
    }
}

/// Stores disagree on identity columns (uuid text vs. bigint); keep both as text.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl Visitor<'_> for IdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a string or integer id")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(value.to_owned())
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}
