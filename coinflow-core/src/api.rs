//! Price API trait and the CoinGecko client.
//!
//! The [`PriceApi`] trait abstracts the upstream price provider so the
//! extractors can be exercised against scripted responses in tests.
//!
//! The real client is deliberately simple: one blocking request, a fixed
//! 10-second timeout, and no retries. A timed-out request is treated like
//! any other failure, and recovery happens one layer up at the extractor
//! boundary via the backup snapshot.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default public CoinGecko API root.
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Per-request network timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure categories for upstream requests.
///
/// The categories matter for diagnosis (rate-limit vs. not-found vs. server
/// error); recovery behavior is identical for all of them.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request timed out after {REQUEST_TIMEOUT:?}")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("rate limited by provider (HTTP 429)")]
    RateLimited,

    #[error("endpoint not found (HTTP 404)")]
    NotFound,

    #[error("server error (HTTP {status})")]
    ServerError { status: u16 },

    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },

    #[error("malformed JSON body: {0}")]
    MalformedJson(String),

    #[error("request failed: {0}")]
    Other(String),
}

/// Upstream price provider.
pub trait PriceApi {
    /// One batched request for current prices: comma-separated coin ids
    /// against comma-separated currency codes, with market cap, 24h volume,
    /// and 24h change included.
    fn simple_price(&self, coin_ids: &str, vs_currencies: &str) -> Result<Value, ApiError>;

    /// OHLC candles for a single coin over a trailing day window.
    fn ohlc(&self, coin_id: &str, currency: &str, days: u32) -> Result<Value, ApiError>;
}

/// Blocking CoinGecko client.
pub struct CoinGeckoClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client pointed at an alternate API root (mock servers in tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("coinflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(classify_transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(classify_status(status.as_u16()));
        }

        resp.json()
            .map_err(|e| ApiError::MalformedJson(e.to_string()))
    }
}

impl Default for CoinGeckoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceApi for CoinGeckoClient {
    fn simple_price(&self, coin_ids: &str, vs_currencies: &str) -> Result<Value, ApiError> {
        let url = format!("{}/simple/price", self.base_url);
        self.get_json(
            &url,
            &[
                ("ids", coin_ids),
                ("vs_currencies", vs_currencies),
                ("include_market_cap", "true"),
                ("include_24hr_vol", "true"),
                ("include_24hr_change", "true"),
            ],
        )
    }

    fn ohlc(&self, coin_id: &str, currency: &str, days: u32) -> Result<Value, ApiError> {
        let url = format!("{}/coins/{coin_id}/ohlc", self.base_url);
        let days = days.to_string();
        self.get_json(&url, &[("vs_currency", currency), ("days", &days)])
    }
}

fn classify_transport(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else if e.is_connect() {
        ApiError::Connection(e.to_string())
    } else {
        ApiError::Other(e.to_string())
    }
}

fn classify_status(status: u16) -> ApiError {
    match status {
        429 => ApiError::RateLimited,
        404 => ApiError::NotFound,
        s if (500..600).contains(&s) => ApiError::ServerError { status: s },
        s => ApiError::Http { status: s },
    }
}
