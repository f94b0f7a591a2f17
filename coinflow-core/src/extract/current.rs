//! Current-price extraction: one batched call, backup fallback on any failure.

use serde_json::Value;
use tracing::{error, info, warn};

use super::RefreshError;
use crate::api::{ApiError, PriceApi};
use crate::backup::{BackupStore, CURRENT_PRICES_KEY};
use crate::domain::{Coin, CurrentPayload};

/// Fetch current prices for the full coin/currency cross-product in a
/// single batched request.
///
/// Success refreshes the backup snapshot and returns the raw payload.
/// Every failure category (timeout, connection error, HTTP error status,
/// malformed body, unexpected response shape) is logged and degrades to
/// the previous backup, or an empty payload when no backup exists. Failed
/// calls never modify the backup.
pub fn extract_current_prices(
    api: &dyn PriceApi,
    store: &BackupStore,
    coins: &[Coin],
    currencies: &[String],
) -> CurrentPayload {
    let (ids, vs) = batch_params(coins, currencies);

    info!(coins = %ids, currencies = %vs, "requesting current prices");

    let body = match api.simple_price(&ids, &vs) {
        Ok(body) => body,
        Err(e) => {
            log_failure(&e);
            return recover(store);
        }
    };

    let payload = match body {
        Value::Object(map) => map,
        other => {
            error!(
                got = type_name(&other),
                "unexpected response shape: expected a JSON object"
            );
            return recover(store);
        }
    };

    // Refresh the backup; a write failure must not cost us the fresh data
    if let Err(e) = store.save(CURRENT_PRICES_KEY, &payload, payload.len()) {
        warn!(error = %e, "failed to refresh current-price backup; continuing with fresh data");
    }

    info!(coins = payload.len(), "current-price extraction succeeded");
    payload
}

/// Strict variant for explicit backup refreshes: any failure is returned
/// to the caller instead of degrading to the previous snapshot, and the
/// backup is only written on genuine success.
pub fn refresh_current_backup(
    api: &dyn PriceApi,
    store: &BackupStore,
    coins: &[Coin],
    currencies: &[String],
) -> Result<CurrentPayload, RefreshError> {
    let (ids, vs) = batch_params(coins, currencies);

    info!(coins = %ids, currencies = %vs, "refreshing current-price backup");

    let payload = match api.simple_price(&ids, &vs)? {
        Value::Object(map) => map,
        other => {
            return Err(RefreshError::UnexpectedShape {
                got: type_name(&other),
            })
        }
    };

    store.save(CURRENT_PRICES_KEY, &payload, payload.len())?;

    info!(coins = payload.len(), "current-price backup refreshed");
    Ok(payload)
}

fn batch_params(coins: &[Coin], currencies: &[String]) -> (String, String) {
    let ids: Vec<&str> = coins.iter().map(|c| c.id.as_str()).collect();
    (ids.join(","), currencies.join(","))
}

fn log_failure(e: &ApiError) {
    match e {
        ApiError::Timeout => error!("current-price request timed out"),
        ApiError::Connection(detail) => error!(%detail, "connection error (network/API issue)"),
        ApiError::RateLimited => error!("rate limit hit (429)"),
        ApiError::NotFound => error!("endpoint not found (404)"),
        ApiError::ServerError { status } => error!(status, "server error from provider"),
        ApiError::Http { status } => error!(status, "unexpected HTTP status"),
        ApiError::MalformedJson(detail) => error!(%detail, "failed to decode JSON body"),
        ApiError::Other(detail) => error!(%detail, "current-price request failed"),
    }
    warn!("falling back to backup snapshot");
}

fn recover(store: &BackupStore) -> CurrentPayload {
    match store.load::<CurrentPayload>(CURRENT_PRICES_KEY) {
        Some(payload) => {
            info!(coins = payload.len(), "recovered current prices from backup");
            payload
        }
        None => {
            warn!("no current-price backup available; returning empty payload");
            CurrentPayload::new()
        }
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
