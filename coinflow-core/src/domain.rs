//! Record types shared across the pipeline.
//!
//! The same serde derives back both the JSON backup snapshots and the CSV
//! output tables, so a field rename here is a schema change everywhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tracked coin from configuration. Immutable during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Stable API slug, e.g. "bitcoin".
    pub id: String,
    /// Display name, e.g. "Bitcoin".
    pub name: String,
    /// Ticker symbol, e.g. "BTC".
    pub symbol: String,
}

impl Coin {
    pub fn new(id: impl Into<String>, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            symbol: symbol.into(),
        }
    }
}

/// Raw current-price payload as returned by the batched API call:
/// coin id → currency-prefixed field → JSON value.
///
/// Kept as raw JSON so the backup snapshot is the verbatim extractor output
/// and the transform stage can be replayed against it byte-for-byte.
pub type CurrentPayload = serde_json::Map<String, Value>;

/// One flattened row of the current-price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentPriceRecord {
    pub coin_id: String,
    pub coin_name: String,
    pub currency: String,
    pub price: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub change_24h: f64,
    /// Extraction wall-clock time, shared across the whole batch.
    pub timestamp: DateTime<Utc>,
}

/// Raw OHLC row as staged by the historical extractor, pre-transform.
///
/// The four price fields stay as raw JSON values: a backup blob restored
/// from disk may carry nulls or strings, and coercion is the transformer's
/// job, not the extractor's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOhlcRecord {
    pub coin_id: String,
    pub coin_name: String,
    pub currency: String,
    pub timestamp_ms: i64,
    pub open: Value,
    pub high: Value,
    pub low: Value,
    pub close: Value,
}

/// Cleaned, enriched OHLC row. Unique on (coin_id, timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcRecord {
    pub coin_id: String,
    pub coin_name: String,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Period-over-period fractional change in close. None on the first
    /// row of each coin's series.
    pub pct_change: Option<f64>,
    /// Trailing mean of close over up to 7 observations (min window 1).
    pub rolling_7d: f64,
    /// Trailing mean of close over up to 30 observations (min window 1).
    pub rolling_30d: f64,
    /// Close rescaled by the first close of the coin's series.
    pub normalized_close: f64,
}

/// Per-coin summary statistics over one cleaned series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinStats {
    pub coin_id: String,
    pub coin_name: String,
    pub max_close: f64,
    pub min_close: f64,
    /// Mean of the defined pct_change values. None for a one-row series.
    pub mean_volatility: Option<f64>,
    /// (last_close - first_close) / first_close over the ordered series.
    /// A zero first close would make this non-finite; the column reports
    /// 0.0 for such a series instead.
    pub total_return: f64,
}
