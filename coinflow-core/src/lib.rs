//! Coinflow Core — the extract/transform heart of the crypto price ETL.
//!
//! This crate contains everything with non-trivial failure-handling policy:
//! - Domain record types shared by the backup store and the CSV outputs
//! - The CoinGecko client behind the [`api::PriceApi`] trait
//! - The last-known-good backup snapshot store
//! - Extractors that degrade to backup-or-empty instead of raising
//! - Transformers that produce validated, schema-consistent tables
//!
//! Loading (CSV output), configuration, and the CLI live in the companion
//! `coinflow-runner` and `coinflow-cli` crates.

pub mod api;
pub mod backup;
pub mod domain;
pub mod extract;
pub mod transform;
