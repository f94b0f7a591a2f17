//! Historical OHLC transformation: clean, order, enrich, summarize.
//!
//! Rows are sorted by (coin_id, timestamp) and deduplicated before any
//! derived column is computed, since the rolling and percentage columns
//! are sequence-dependent. Enrichment runs per coin as a pure function over
//! that coin's ordered slice; one coin's data never influences another's
//! derived columns.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::coerce_f64;
use crate::domain::{CoinStats, OhlcRecord, RawOhlcRecord};

/// The two output tables of the historical transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalTables {
    /// Cleaned, enriched rows, sorted ascending by (coin_id, timestamp).
    pub clean: Vec<OhlcRecord>,
    /// Exactly one summary row per distinct coin_id.
    pub stats: Vec<CoinStats>,
}

/// A row that survived timestamp conversion and numeric coercion.
struct CleanRow {
    coin_id: String,
    coin_name: String,
    currency: String,
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Clean and enrich raw OHLC rows. Empty input yields empty tables.
pub fn transform_historical_prices(raw: &[RawOhlcRecord]) -> HistoricalTables {
    if raw.is_empty() {
        info!("no historical rows to transform");
        return HistoricalTables::default();
    }

    info!(rows = raw.len(), "transforming historical OHLC rows");

    let mut rows: Vec<CleanRow> = Vec::with_capacity(raw.len());
    for record in raw {
        let Some(timestamp) = DateTime::from_timestamp_millis(record.timestamp_ms) else {
            warn!(
                coin = %record.coin_id,
                timestamp_ms = record.timestamp_ms,
                "dropping row with out-of-range timestamp"
            );
            continue;
        };

        let (Some(open), Some(high), Some(low), Some(close)) = (
            coerce_f64(&record.open),
            coerce_f64(&record.high),
            coerce_f64(&record.low),
            coerce_f64(&record.close),
        ) else {
            warn!(
                coin = %record.coin_id,
                timestamp_ms = record.timestamp_ms,
                "dropping row with missing or non-numeric OHLC field"
            );
            continue;
        };

        rows.push(CleanRow {
            coin_id: record.coin_id.clone(),
            coin_name: record.coin_name.clone(),
            currency: record.currency.clone(),
            timestamp,
            open,
            high,
            low,
            close,
        });
    }

    rows.sort_by(|a, b| {
        (a.coin_id.as_str(), a.timestamp).cmp(&(b.coin_id.as_str(), b.timestamp))
    });
    // Unique on (coin_id, timestamp), keeping the first occurrence
    rows.dedup_by(|a, b| a.coin_id == b.coin_id && a.timestamp == b.timestamp);

    let mut clean = Vec::with_capacity(rows.len());
    let mut stats = Vec::new();

    let mut start = 0;
    while start < rows.len() {
        let coin_id = rows[start].coin_id.as_str();
        let end = rows[start..]
            .iter()
            .position(|r| r.coin_id != coin_id)
            .map(|offset| start + offset)
            .unwrap_or(rows.len());

        let (mut enriched, coin_stats) = enrich_series(&rows[start..end]);
        clean.append(&mut enriched);
        stats.push(coin_stats);
        start = end;
    }

    info!(
        clean_rows = clean.len(),
        stat_rows = stats.len(),
        "historical transformation complete"
    );

    HistoricalTables { clean, stats }
}

/// Enrich one coin's ordered series and aggregate its summary row.
fn enrich_series(rows: &[CleanRow]) -> (Vec<OhlcRecord>, CoinStats) {
    debug_assert!(!rows.is_empty());

    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let first_close = closes[0];
    let last_close = closes[closes.len() - 1];
    let rolling_7 = rolling_mean(&closes, 7);
    let rolling_30 = rolling_mean(&closes, 30);

    let mut enriched = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let pct_change = if i == 0 {
            None
        } else {
            let prev = closes[i - 1];
            // Zero previous close would produce a non-finite change
            (prev != 0.0).then(|| (closes[i] - prev) / prev)
        };

        let normalized_close = if first_close == 0.0 {
            row.close
        } else {
            row.close / first_close
        };

        enriched.push(OhlcRecord {
            coin_id: row.coin_id.clone(),
            coin_name: row.coin_name.clone(),
            currency: row.currency.clone(),
            timestamp: row.timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            pct_change,
            rolling_7d: rolling_7[i],
            rolling_30d: rolling_30[i],
            normalized_close,
        });
    }

    let changes: Vec<f64> = enriched.iter().filter_map(|r| r.pct_change).collect();
    let mean_volatility = if changes.is_empty() {
        None
    } else {
        Some(changes.iter().sum::<f64>() / changes.len() as f64)
    };

    let total_return = if first_close == 0.0 {
        0.0
    } else {
        (last_close - first_close) / first_close
    };

    let stats = CoinStats {
        coin_id: rows[0].coin_id.clone(),
        coin_name: rows[0].coin_name.clone(),
        max_close: closes.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        min_close: closes.iter().cloned().fold(f64::INFINITY, f64::min),
        mean_volatility,
        total_return,
    };

    (enriched, stats)
}

/// Trailing moving average with a minimum window of 1: early values
/// average over however many observations exist so far.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window >= 1, "rolling window must be >= 1");

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        let span = (i + 1).min(window);
        out.push(sum / span as f64);
    }
    out
}
