//! Pipeline settings, loadable from TOML.

use coinflow_core::domain::Coin;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Static run configuration: tracked coins, fiat currencies, the historical
/// window, and the data directories. Immutable during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Coins to track.
    pub coins: Vec<Coin>,

    /// Fiat currencies for the current-price cross-product.
    pub currencies: Vec<String>,

    /// Quote currency for historical OHLC extraction.
    pub default_currency: String,

    /// Trailing day window for historical OHLC extraction.
    pub default_days: u32,

    /// Uniform range, in seconds, for the historical inter-request delay.
    /// Negative or reversed bounds are normalized by the extractor.
    pub request_delay_secs: (f64, f64),

    /// Directory holding the raw backup snapshots.
    pub data_dir: PathBuf,

    /// Directory receiving the cleaned CSV outputs.
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            coins: vec![
                Coin::new("bitcoin", "Bitcoin", "BTC"),
                Coin::new("ethereum", "Ethereum", "ETH"),
                Coin::new("binancecoin", "BNB", "BNB"),
                Coin::new("solana", "Solana", "SOL"),
                Coin::new("ripple", "XRP", "XRP"),
            ],
            currencies: vec!["gbp".into(), "usd".into(), "eur".into()],
            default_currency: "gbp".into(),
            default_days: 365,
            request_delay_secs: coinflow_core::extract::historical::DELAY_RANGE_SECS,
            data_dir: PathBuf::from("data/raw"),
            output_dir: PathBuf::from("data/cleaned"),
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
