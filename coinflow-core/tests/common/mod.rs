//! Shared test doubles: a scripted [`PriceApi`] and temp-dir backup stores.

// Not every integration test binary uses every helper
#![allow(dead_code)]

use coinflow_core::api::{ApiError, PriceApi};
use coinflow_core::backup::BackupStore;
use coinflow_core::domain::Coin;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A backup store rooted in a fresh temp directory per test.
pub fn temp_store(label: &str) -> BackupStore {
    let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "coinflow_{label}_{}_{id}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    BackupStore::new(dir)
}

pub fn bitcoin() -> Coin {
    Coin::new("bitcoin", "Bitcoin", "BTC")
}

pub fn ethereum() -> Coin {
    Coin::new("ethereum", "Ethereum", "ETH")
}

/// Price API double that replays scripted responses in order.
#[derive(Default)]
pub struct MockApi {
    simple_price: Mutex<VecDeque<Result<Value, ApiError>>>,
    ohlc: Mutex<VecDeque<Result<Value, ApiError>>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_simple_price(&self, response: Result<Value, ApiError>) {
        self.simple_price.lock().unwrap().push_back(response);
    }

    pub fn push_ohlc(&self, response: Result<Value, ApiError>) {
        self.ohlc.lock().unwrap().push_back(response);
    }
}

impl PriceApi for MockApi {
    fn simple_price(&self, _coin_ids: &str, _vs_currencies: &str) -> Result<Value, ApiError> {
        self.simple_price
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Other("no scripted response".into())))
    }

    fn ohlc(&self, _coin_id: &str, _currency: &str, _days: u32) -> Result<Value, ApiError> {
        self.ohlc
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Other("no scripted response".into())))
    }
}

/// `count` well-formed OHLC rows starting at a fixed epoch, one hour apart.
pub fn valid_ohlc_rows(count: usize) -> Value {
    let rows: Vec<Value> = (0..count)
        .map(|i| {
            let ts = 1_700_000_000_000i64 + i as i64 * 3_600_000;
            serde_json::json!([ts, 100.0 + i as f64, 110.0 + i as f64, 90.0 + i as f64, 105.0 + i as f64])
        })
        .collect();
    Value::Array(rows)
}
