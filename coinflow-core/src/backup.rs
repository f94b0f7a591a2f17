//! Last-known-good backup snapshot store.
//!
//! One JSON blob per dataset, holding the verbatim last-successful raw
//! extractor payload. Layout: `{dir}/backup_{key}.json` plus a
//! `backup_{key}.meta.json` sidecar (content hash, entry count, saved-at).
//!
//! Writes are atomic (write to `.tmp`, rename into place) so a crash
//! mid-write can never leave a partially-corrupt snapshot behind. Corrupt
//! blobs found on load are quarantined and treated as absent.
//!
//! Extractors own write access; transformers only ever read extractor
//! output and never touch this store.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Snapshot key for the batched current-price payload.
pub const CURRENT_PRICES_KEY: &str = "current_prices";

/// Snapshot key for the historical OHLC row list.
pub const HISTORICAL_OHLC_KEY: &str = "historical_ohlc";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backup serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Metadata sidecar for one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub key: String,
    pub entry_count: usize,
    pub data_hash: String,
    pub saved_at: DateTime<Utc>,
}

/// Whole-file JSON snapshot store rooted at a directory.
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("backup_{key}.json"))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("backup_{key}.meta.json"))
    }

    /// Overwrite the snapshot for `key` with the given payload.
    pub fn save<T: Serialize + ?Sized>(
        &self,
        key: &str,
        payload: &T,
        entry_count: usize,
    ) -> Result<(), BackupError> {
        fs::create_dir_all(&self.dir)?;

        let bytes = serde_json::to_vec_pretty(payload)?;
        let path = self.blob_path(key);
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, &bytes)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            // Don't leave the temp file behind on rename failure
            let _ = fs::remove_file(&tmp_path);
            e
        })?;

        let meta = SnapshotMeta {
            key: key.to_string(),
            entry_count,
            data_hash: blake3::hash(&bytes).to_hex().to_string(),
            saved_at: Utc::now(),
        };
        fs::write(self.meta_path(key), serde_json::to_vec_pretty(&meta)?)?;

        info!(key, entry_count, path = %path.display(), "backup snapshot saved");
        Ok(())
    }

    /// Load the snapshot for `key`. Absent snapshots are `None`, not an
    /// error; a blob that fails to parse is quarantined and reported absent.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.blob_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return None,
        };

        match serde_json::from_str(&content) {
            Ok(payload) => Some(payload),
            Err(e) => {
                let quarantine = path.with_extension("json.quarantined");
                warn!(
                    key,
                    error = %e,
                    path = %path.display(),
                    "quarantining corrupt backup snapshot"
                );
                let _ = fs::rename(&path, &quarantine);
                let _ = fs::remove_file(self.meta_path(key));
                None
            }
        }
    }

    /// Read the metadata sidecar for `key`, if present and parseable.
    pub fn meta(&self, key: &str) -> Option<SnapshotMeta> {
        let content = fs::read_to_string(self.meta_path(key)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Whether a snapshot blob exists for `key`.
    pub fn exists(&self, key: &str) -> bool {
        self.blob_path(key).exists()
    }
}
