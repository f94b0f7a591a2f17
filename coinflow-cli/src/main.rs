//! Coinflow CLI — ETL run and backup management commands.
//!
//! Commands:
//! - `run` — execute the ETL pipeline (current prices, historical OHLC, or both)
//! - `backup update` — force-refresh the backup snapshots from the live API
//! - `backup status` — report what the backup store currently holds

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coinflow_core::api::CoinGeckoClient;
use coinflow_core::backup::{BackupStore, CURRENT_PRICES_KEY, HISTORICAL_OHLC_KEY};
use coinflow_core::extract::{refresh_current_backup, HistoricalExtractor};
use coinflow_runner::{run_current_etl, run_full_pipeline, run_historical_etl, Settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coinflow", about = "Coinflow CLI — cryptocurrency price ETL pipeline")]
struct Cli {
    /// Path to a TOML settings file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the ETL pipeline and write the CSV outputs.
    Run {
        /// Only run the current-price ETL.
        #[arg(long, default_value_t = false, conflicts_with = "historical_only")]
        current_only: bool,

        /// Only run the historical OHLC ETL.
        #[arg(long, default_value_t = false)]
        historical_only: bool,

        /// Trailing day window for historical OHLC. Overrides settings.
        #[arg(long)]
        days: Option<u32>,

        /// Quote currency for historical OHLC. Overrides settings.
        #[arg(long)]
        currency: Option<String>,

        /// Directory holding the backup snapshots. Overrides settings.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Directory receiving the CSV outputs. Overrides settings.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Backup snapshot management commands.
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand)]
enum BackupAction {
    /// Force-refresh both backup snapshots from the live API.
    ///
    /// Unlike `run`, a failed extraction here is an error, not a fallback.
    Update {
        /// Directory holding the backup snapshots. Overrides settings.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Report what the backup store currently holds.
    Status {
        /// Directory holding the backup snapshots. Overrides settings.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            current_only,
            historical_only,
            days,
            currency,
            data_dir,
            output_dir,
        } => {
            let mut settings = settings;
            if let Some(days) = days {
                settings.default_days = days;
            }
            if let Some(currency) = currency {
                settings.default_currency = currency;
            }
            if let Some(dir) = data_dir {
                settings.data_dir = dir;
            }
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            run_cmd(&settings, current_only, historical_only)
        }
        Commands::Backup { action } => match action {
            BackupAction::Update { data_dir } => {
                let mut settings = settings;
                if let Some(dir) = data_dir {
                    settings.data_dir = dir;
                }
                backup_update(&settings)
            }
            BackupAction::Status { data_dir } => {
                let dir = data_dir.unwrap_or(settings.data_dir);
                backup_status(&BackupStore::new(dir))
            }
        },
    }
}

fn load_settings(path: Option<&std::path::Path>) -> Result<Settings> {
    match path {
        Some(path) => {
            Settings::from_file(path).with_context(|| format!("loading {}", path.display()))
        }
        None => Ok(Settings::default()),
    }
}

fn run_cmd(settings: &Settings, current_only: bool, historical_only: bool) -> Result<()> {
    let api = CoinGeckoClient::new();
    let store = BackupStore::new(&settings.data_dir);

    if current_only {
        let path = run_current_etl(&api, &store, settings)?;
        println!("Current prices saved to: {}", path.display());
        return Ok(());
    }

    if historical_only {
        let paths = run_historical_etl(&api, &store, settings)?;
        println!("Historical prices saved to: {}", paths.clean.display());
        println!("Coin statistics saved to:   {}", paths.stats.display());
        return Ok(());
    }

    let (current, historical) = run_full_pipeline(&api, &store, settings)?;
    println!("Current prices saved to:    {}", current.display());
    println!("Historical prices saved to: {}", historical.clean.display());
    println!("Coin statistics saved to:   {}", historical.stats.display());
    Ok(())
}

/// Refresh both snapshots directly from the live API, treating any failure
/// as a hard error so a cron caller notices a stale backup. Uses the strict
/// refresh variants: the fallback extractors would serve the previous
/// snapshot on failure and mask exactly the staleness this command exists
/// to prevent.
fn backup_update(settings: &Settings) -> Result<()> {
    let api = CoinGeckoClient::new();
    let store = BackupStore::new(&settings.data_dir);

    let payload = refresh_current_backup(&api, &store, &settings.coins, &settings.currencies)
        .context("current-price backup refresh failed; backup left untouched")?;
    println!("Current-price backup refreshed ({} coins).", payload.len());

    let rows = HistoricalExtractor::new(&api, &store)
        .with_delay_range(settings.request_delay_secs)
        .refresh_backup(&settings.coins, &settings.default_currency, settings.default_days)
        .context("historical backup refresh failed; backup left untouched")?;
    println!("Historical backup refreshed ({} rows).", rows.len());

    Ok(())
}

fn backup_status(store: &BackupStore) -> Result<()> {
    if !store.dir().exists() {
        println!("Backup directory does not exist: {}", store.dir().display());
        return Ok(());
    }

    println!("Backup store: {}", store.dir().display());
    println!();
    println!("{:<18} {:<8} {:<26} {}", "Dataset", "Entries", "Saved At", "Hash");
    println!("{}", "-".repeat(70));

    for key in [CURRENT_PRICES_KEY, HISTORICAL_OHLC_KEY] {
        match store.meta(key) {
            Some(meta) => println!(
                "{:<18} {:<8} {:<26} {}",
                meta.key,
                meta.entry_count,
                meta.saved_at.format("%Y-%m-%d %H:%M:%S UTC"),
                &meta.data_hash[..12.min(meta.data_hash.len())],
            ),
            None if store.exists(key) => {
                println!("{key:<18} (snapshot present, no metadata)")
            }
            None => println!("{key:<18} (absent)"),
        }
    }

    Ok(())
}
