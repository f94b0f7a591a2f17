//! Coinflow Runner — settings, CSV loaders, and ETL orchestration.

pub mod config;
pub mod load;
pub mod pipeline;

pub use config::Settings;
pub use load::{load_current_prices, load_historical_prices, HistoricalPaths};
pub use pipeline::{run_current_etl, run_full_pipeline, run_historical_etl};
