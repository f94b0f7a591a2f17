//! End-to-end ETL runs wiring extract, transform, and load together.

use anyhow::Result;
use coinflow_core::api::PriceApi;
use coinflow_core::backup::BackupStore;
use coinflow_core::extract::{extract_current_prices, HistoricalExtractor};
use coinflow_core::transform::{transform_current_prices, transform_historical_prices};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::config::Settings;
use crate::load::{load_current_prices, load_historical_prices, HistoricalPaths};

/// Run the current-price ETL: batched extraction with backup fallback,
/// flattening, and a CSV write.
pub fn run_current_etl(
    api: &dyn PriceApi,
    store: &BackupStore,
    settings: &Settings,
) -> Result<PathBuf> {
    let raw = timed("extract current prices", || {
        extract_current_prices(api, store, &settings.coins, &settings.currencies)
    });

    let records = timed("transform current prices", || {
        transform_current_prices(&raw, &settings.coins, &settings.currencies)
    });

    let path = timed("load current prices", || {
        load_current_prices(&records, &settings.output_dir)
    })?;

    info!(rows = records.len(), path = %path.display(), "current-price ETL complete");
    Ok(path)
}

/// Run the historical OHLC ETL: sequential per-coin extraction with the
/// all-or-nothing backup policy, enrichment, and the two CSV writes.
pub fn run_historical_etl(
    api: &dyn PriceApi,
    store: &BackupStore,
    settings: &Settings,
) -> Result<HistoricalPaths> {
    let raw = timed("extract historical prices", || {
        HistoricalExtractor::new(api, store)
            .with_delay_range(settings.request_delay_secs)
            .extract(&settings.coins, &settings.default_currency, settings.default_days)
    });

    let tables = timed("transform historical prices", || {
        transform_historical_prices(&raw)
    });

    let paths = timed("load historical prices", || {
        load_historical_prices(&tables, &settings.output_dir)
    })?;

    info!(
        rows = tables.clean.len(),
        coins = tables.stats.len(),
        "historical ETL complete"
    );
    Ok(paths)
}

/// Run both ETLs back to back. Extraction failures never surface here;
/// only I/O errors from the load steps can abort the run.
pub fn run_full_pipeline(
    api: &dyn PriceApi,
    store: &BackupStore,
    settings: &Settings,
) -> Result<(PathBuf, HistoricalPaths)> {
    let started = Instant::now();
    info!("starting full pipeline");

    let current = run_current_etl(api, store, settings)?;
    let historical = run_historical_etl(api, store, settings)?;

    info!(elapsed_secs = format!("{:.2}", started.elapsed().as_secs_f64()), "full pipeline complete");
    Ok((current, historical))
}

fn timed<T>(step: &str, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let result = f();
    info!(
        step,
        elapsed_secs = format!("{:.2}", started.elapsed().as_secs_f64()),
        "step finished"
    );
    result
}
