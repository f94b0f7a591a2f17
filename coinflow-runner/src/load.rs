//! Load step: persist the cleaned tables as CSV.

use anyhow::{Context, Result};
use coinflow_core::domain::CurrentPriceRecord;
use coinflow_core::transform::HistoricalTables;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CURRENT_PRICES_CSV: &str = "current_crypto_prices.csv";
pub const HISTORICAL_PRICES_CSV: &str = "historical_crypto_prices.csv";
pub const HISTORICAL_STATS_CSV: &str = "historical_crypto_stats.csv";

/// Output file paths of the historical load step.
#[derive(Debug, Clone)]
pub struct HistoricalPaths {
    pub clean: PathBuf,
    pub stats: PathBuf,
}

/// Write the current-price table to `{output_dir}/current_crypto_prices.csv`,
/// overwriting the previous snapshot.
pub fn load_current_prices(
    records: &[CurrentPriceRecord],
    output_dir: &Path,
) -> Result<PathBuf> {
    let path = output_dir.join(CURRENT_PRICES_CSV);
    write_csv(&path, records)?;
    Ok(path)
}

/// Write the cleaned OHLC table and the per-coin stats table.
pub fn load_historical_prices(
    tables: &HistoricalTables,
    output_dir: &Path,
) -> Result<HistoricalPaths> {
    let clean = output_dir.join(HISTORICAL_PRICES_CSV);
    write_csv(&clean, &tables.clean)?;

    let stats = output_dir.join(HISTORICAL_STATS_CSV);
    write_csv(&stats, &tables.stats)?;

    Ok(HistoricalPaths { clean, stats })
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;

    let size_kb = std::fs::metadata(path).map(|m| m.len() as f64 / 1024.0).unwrap_or(0.0);
    info!(
        path = %path.display(),
        rows = rows.len(),
        size_kb = format!("{size_kb:.2}"),
        "saved CSV"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("coinflow_load_{}_{id}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn sample_record() -> CurrentPriceRecord {
        CurrentPriceRecord {
            coin_id: "bitcoin".into(),
            coin_name: "Bitcoin".into(),
            currency: "usd".into(),
            price: 100.0,
            market_cap: 1000.0,
            volume_24h: 0.0,
            change_24h: 0.0,
            timestamp: Utc.with_ymd_and_hms(2026, 8, 24, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = temp_dir();
        let path = load_current_prices(&[sample_record()], &dir).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "coin_id,coin_name,currency,price,market_cap,volume_24h,change_24h,timestamp"
        );
        assert!(lines.next().unwrap().starts_with("bitcoin,Bitcoin,usd,100"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = temp_dir().join("nested/cleaned");
        let path = load_current_prices(&[sample_record()], &dir).unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(dir.parent().unwrap());
    }

    #[test]
    fn historical_load_writes_both_tables() {
        let dir = temp_dir();
        let paths = load_historical_prices(&HistoricalTables::default(), &dir).unwrap();

        // Empty tables still produce files (headers may be absent with no rows)
        assert!(paths.clean.exists());
        assert!(paths.stats.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
