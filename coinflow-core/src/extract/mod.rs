//! Extractors: fetch raw payloads with backup fallback.
//!
//! Both extractors absorb every network and protocol failure at this
//! boundary: callers always get a payload (fresh, backup-recovered, or
//! empty), never an error.
//!
//! Each also has a strict refresh variant for explicit backup updates,
//! where a stale snapshot must be reported rather than papered over:
//! those return [`RefreshError`] instead of falling back.

use thiserror::Error;

use crate::api::ApiError;
use crate::backup::BackupError;

pub mod current;
pub mod historical;

pub use current::{extract_current_prices, refresh_current_backup};
pub use historical::HistoricalExtractor;

/// Why a strict backup refresh failed. Unlike the fallback extractors,
/// refreshes surface these to the caller; the snapshot on disk is only
/// written on full success.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("unexpected response shape: expected a JSON object, got {got}")]
    UnexpectedShape { got: &'static str },

    #[error("coin {id} failed: {reason}")]
    Coin { id: String, reason: String },

    #[error(transparent)]
    Backup(#[from] BackupError),
}
