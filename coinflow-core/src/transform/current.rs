//! Current-price transformation: flatten the nested payload into one row
//! per (coin, currency) pair.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::coerce_f64;
use crate::domain::{Coin, CurrentPayload, CurrentPriceRecord};

/// Flatten the raw batched payload into validated records, stamped with the
/// current UTC time shared across the batch.
///
/// Row policy:
/// - `price` is required; rows without a numeric price are dropped
/// - market cap / volume / change default to 0 when absent or non-numeric
/// - coins missing from configuration get a capitalized-id fallback name
///   and a warning, never an error
/// - negative values are anomaly signals, logged but kept
/// - output is deduplicated and sorted by (coin_id, currency)
pub fn transform_current_prices(
    raw: &CurrentPayload,
    coins: &[Coin],
    currencies: &[String],
) -> Vec<CurrentPriceRecord> {
    transform_current_prices_at(raw, coins, currencies, Utc::now())
}

/// Same as [`transform_current_prices`] with an explicit batch timestamp.
pub fn transform_current_prices_at(
    raw: &CurrentPayload,
    coins: &[Coin],
    currencies: &[String],
    timestamp: DateTime<Utc>,
) -> Vec<CurrentPriceRecord> {
    info!(
        coins = raw.len(),
        currencies = currencies.len(),
        "transforming current prices"
    );

    let names: HashMap<&str, &str> = coins
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    let mut records = Vec::with_capacity(raw.len() * currencies.len());

    for (coin_id, entry) in raw {
        let coin_name = match names.get(coin_id.as_str()) {
            Some(name) => (*name).to_string(),
            None => {
                warn!(coin = %coin_id, "unknown coin id in API response");
                capitalize(coin_id)
            }
        };

        let fields = match entry.as_object() {
            Some(fields) => fields,
            None => {
                warn!(coin = %coin_id, "coin entry is not an object; skipping");
                continue;
            }
        };

        for currency in currencies {
            let Some(price) = fields.get(currency.as_str()).and_then(coerce_f64) else {
                warn!(coin = %coin_id, %currency, "missing or non-numeric price; dropping record");
                continue;
            };

            let market_cap = numeric_or_zero(fields, coin_id, &format!("{currency}_market_cap"));
            let volume_24h = numeric_or_zero(fields, coin_id, &format!("{currency}_24h_vol"));
            let change_24h = numeric_or_zero(fields, coin_id, &format!("{currency}_24h_change"));

            if price < 0.0 || market_cap < 0.0 || volume_24h < 0.0 {
                warn!(
                    coin = %coin_id,
                    %currency,
                    price,
                    market_cap,
                    volume_24h,
                    "negative value anomaly"
                );
            }

            records.push(CurrentPriceRecord {
                coin_id: coin_id.clone(),
                coin_name: coin_name.clone(),
                currency: currency.clone(),
                price,
                market_cap,
                volume_24h,
                change_24h,
                timestamp,
            });
        }
    }

    records.sort_by(|a, b| {
        (a.coin_id.as_str(), a.currency.as_str()).cmp(&(b.coin_id.as_str(), b.currency.as_str()))
    });
    records.dedup();

    info!(rows = records.len(), "current-price transformation complete");
    records
}

fn numeric_or_zero(
    fields: &serde_json::Map<String, serde_json::Value>,
    coin_id: &str,
    key: &str,
) -> f64 {
    match fields.get(key).and_then(coerce_f64) {
        Some(v) => v,
        None => {
            debug!(coin = %coin_id, field = %key, "missing or non-numeric field; defaulting to 0");
            0.0
        }
    }
}

fn capitalize(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_basic() {
        assert_eq!(capitalize("dogecoin"), "Dogecoin");
        assert_eq!(capitalize(""), "");
    }
}
