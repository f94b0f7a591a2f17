//! Historical OHLC extraction: sequential per-coin calls with an
//! all-or-nothing backup policy.
//!
//! Coins are fetched one at a time with a randomized delay between
//! requests, a deliberate throttling policy against the provider's
//! implicit rate limit. A failed coin does not stop the loop, but it
//! does invalidate the whole batch: the staged
//! rows are committed (backup overwritten + returned) only when every
//! coin succeeds; otherwise the previous snapshot is served verbatim and
//! the backup file is left untouched.

use rand::Rng;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::RefreshError;
use crate::api::{ApiError, PriceApi};
use crate::backup::{BackupStore, HISTORICAL_OHLC_KEY};
use crate::domain::{Coin, RawOhlcRecord};

/// A response with fewer raw rows than this marks the coin as failed.
pub const MIN_ROWS_PER_COIN: usize = 10;

/// Uniform range, in seconds, for the inter-request delay.
pub const DELAY_RANGE_SECS: (f64, f64) = (1.5, 3.0);

/// Why a single coin's extraction failed. Partial-batch tolerant: the
/// loop continues past these, but any one of them blocks the commit.
enum CoinFailure {
    Api(ApiError),
    NotAnArray,
    TooFewRows { got: usize },
}

impl fmt::Display for CoinFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinFailure::Api(e) => write!(f, "{e}"),
            CoinFailure::NotAnArray => write!(f, "response is not a JSON array"),
            CoinFailure::TooFewRows { got } => {
                write!(f, "only {got} rows (minimum {MIN_ROWS_PER_COIN})")
            }
        }
    }
}

/// Sequential per-coin OHLC extractor.
pub struct HistoricalExtractor<'a> {
    api: &'a dyn PriceApi,
    store: &'a BackupStore,
    delay_secs: (f64, f64),
    min_rows: usize,
}

impl<'a> HistoricalExtractor<'a> {
    pub fn new(api: &'a dyn PriceApi, store: &'a BackupStore) -> Self {
        Self {
            api,
            store,
            delay_secs: DELAY_RANGE_SECS,
            min_rows: MIN_ROWS_PER_COIN,
        }
    }

    /// Override the inter-request delay range. `(0.0, 0.0)` disables
    /// sleeping entirely (tests).
    ///
    /// The bounds come from user TOML, so junk is normalized rather than
    /// panicking downstream: negative bounds clamp to zero and a reversed
    /// range collapses to its low bound.
    pub fn with_delay_range(mut self, delay_secs: (f64, f64)) -> Self {
        let lo = delay_secs.0.max(0.0);
        let hi = delay_secs.1.max(lo);
        self.delay_secs = (lo, hi);
        self
    }

    /// Extract OHLC rows for every coin over a trailing day window.
    ///
    /// Returns the freshly staged batch when all coins succeed (and
    /// overwrites the backup with it), otherwise the previous backup
    /// snapshot, otherwise an empty list. Never errors past this boundary.
    pub fn extract(&self, coins: &[Coin], currency: &str, days: u32) -> Vec<RawOhlcRecord> {
        info!(
            coins = coins.len(),
            currency, days, "starting historical OHLC extraction"
        );

        let (staged, failed) = self.stage(coins, currency, days);

        // All-or-nothing: one failed coin invalidates the whole batch's
        // freshness guarantee.
        if !failed.is_empty() {
            let ids: Vec<&str> = failed.iter().map(|(id, _)| id.as_str()).collect();
            warn!(
                failed = failed.len(),
                coins = ?ids,
                "batch incomplete; discarding staged rows"
            );
            return self.recover();
        }

        if let Err(e) = self.store.save(HISTORICAL_OHLC_KEY, &staged, staged.len()) {
            warn!(error = %e, "failed to refresh historical backup; continuing with fresh data");
        }

        info!(rows = staged.len(), "historical extraction succeeded");
        staged
    }

    /// Strict variant for explicit backup refreshes: the first failed coin
    /// aborts with an error and the snapshot is only written when every
    /// coin succeeds.
    pub fn refresh_backup(
        &self,
        coins: &[Coin],
        currency: &str,
        days: u32,
    ) -> Result<Vec<RawOhlcRecord>, RefreshError> {
        info!(
            coins = coins.len(),
            currency, days, "refreshing historical backup"
        );

        let (staged, mut failed) = self.stage(coins, currency, days);
        if let Some((id, reason)) = failed.drain(..).next() {
            return Err(RefreshError::Coin { id, reason });
        }

        self.store.save(HISTORICAL_OHLC_KEY, &staged, staged.len())?;

        info!(rows = staged.len(), "historical backup refreshed");
        Ok(staged)
    }

    /// Sequential fetch loop shared by both entry points: staged rows for
    /// the coins that succeeded, plus (id, reason) for those that did not.
    fn stage(
        &self,
        coins: &[Coin],
        currency: &str,
        days: u32,
    ) -> (Vec<RawOhlcRecord>, Vec<(String, String)>) {
        let mut staged: Vec<RawOhlcRecord> = Vec::new();
        let mut failed: Vec<(String, String)> = Vec::new();

        for coin in coins {
            self.throttle();

            match self.fetch_coin(coin, currency, days) {
                Ok(rows) => {
                    debug!(coin = %coin.id, rows = rows.len(), "coin extraction succeeded");
                    staged.extend(rows);
                }
                Err(reason) => {
                    error!(coin = %coin.id, %reason, "coin extraction failed");
                    failed.push((coin.id.clone(), reason.to_string()));
                }
            }
        }

        (staged, failed)
    }

    fn fetch_coin(
        &self,
        coin: &Coin,
        currency: &str,
        days: u32,
    ) -> Result<Vec<RawOhlcRecord>, CoinFailure> {
        debug!(coin = %coin.id, currency, "fetching OHLC");

        let body = self
            .api
            .ohlc(&coin.id, currency, days)
            .map_err(CoinFailure::Api)?;

        let rows = match body {
            Value::Array(rows) => rows,
            _ => return Err(CoinFailure::NotAnArray),
        };

        // The threshold counts raw response rows; malformed rows below are
        // skipped without flipping the coin to failed.
        if rows.len() < self.min_rows {
            return Err(CoinFailure::TooFewRows { got: rows.len() });
        }

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match parse_row(coin, currency, row) {
                Some(record) => records.push(record),
                None => warn!(coin = %coin.id, %row, "skipping malformed OHLC row"),
            }
        }

        Ok(records)
    }

    fn recover(&self) -> Vec<RawOhlcRecord> {
        match self.store.load::<Vec<RawOhlcRecord>>(HISTORICAL_OHLC_KEY) {
            Some(rows) => {
                info!(rows = rows.len(), "recovered historical OHLC from backup");
                rows
            }
            None => {
                warn!("no historical backup available; returning empty list");
                Vec::new()
            }
        }
    }

    fn throttle(&self) {
        let (lo, hi) = self.delay_secs;
        if hi <= 0.0 {
            return;
        }
        let secs = rand::thread_rng().gen_range(lo..=hi);
        std::thread::sleep(Duration::from_secs_f64(secs));
    }
}

/// Parse one raw `[timestamp_ms, open, high, low, close]` row.
///
/// Field count and an integral timestamp are the only requirements here;
/// price values stay raw for the transformer to coerce.
fn parse_row(coin: &Coin, currency: &str, row: &Value) -> Option<RawOhlcRecord> {
    let fields = row.as_array()?;
    if fields.len() != 5 {
        return None;
    }
    let timestamp_ms = fields[0].as_i64()?;

    Some(RawOhlcRecord {
        coin_id: coin.id.clone(),
        coin_name: coin.name.clone(),
        currency: currency.to_string(),
        timestamp_ms,
        open: fields[1].clone(),
        high: fields[2].clone(),
        low: fields[3].clone(),
        close: fields[4].clone(),
    })
}
