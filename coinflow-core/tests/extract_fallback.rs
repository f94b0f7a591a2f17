//! Extractor fallback behavior: backup refresh on success, backup-or-empty
//! recovery on failure, and the historical all-or-nothing commit policy.

mod common;

use coinflow_core::api::ApiError;
use coinflow_core::backup::{CURRENT_PRICES_KEY, HISTORICAL_OHLC_KEY};
use coinflow_core::domain::{CurrentPayload, RawOhlcRecord};
use coinflow_core::extract::{
    extract_current_prices, refresh_current_backup, HistoricalExtractor,
};
use serde_json::json;

use common::{bitcoin, ethereum, temp_store, valid_ohlc_rows, MockApi};

fn currencies(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

// ─── Current-price extractor ────────────────────────────────────────

#[test]
fn current_success_returns_payload_and_refreshes_backup() {
    let api = MockApi::new();
    let store = temp_store("cur_ok");
    api.push_simple_price(Ok(json!({
        "bitcoin": {"usd": 100.0, "usd_market_cap": 1000.0}
    })));

    let payload = extract_current_prices(&api, &store, &[bitcoin()], &currencies(&["usd"]));

    assert_eq!(payload.len(), 1);
    assert!(payload.contains_key("bitcoin"));

    let backed_up: CurrentPayload = store.load(CURRENT_PRICES_KEY).unwrap();
    assert_eq!(backed_up, payload);
}

#[test]
fn current_timeout_loads_backup() {
    let api = MockApi::new();
    let store = temp_store("cur_timeout");

    let mut previous = CurrentPayload::new();
    previous.insert("bitcoin".into(), json!({"usd": 55.0}));
    store
        .save(CURRENT_PRICES_KEY, &previous, previous.len())
        .unwrap();

    api.push_simple_price(Err(ApiError::Timeout));
    let payload = extract_current_prices(&api, &store, &[bitcoin()], &currencies(&["usd"]));

    assert_eq!(payload, previous);
}

#[test]
fn current_failure_without_backup_returns_empty() {
    let api = MockApi::new();
    let store = temp_store("cur_empty");
    api.push_simple_price(Err(ApiError::RateLimited));

    let payload = extract_current_prices(&api, &store, &[bitcoin()], &currencies(&["usd"]));

    assert!(payload.is_empty());
    assert!(!store.exists(CURRENT_PRICES_KEY));
}

#[test]
fn current_non_object_response_falls_back() {
    let api = MockApi::new();
    let store = temp_store("cur_shape");

    let mut previous = CurrentPayload::new();
    previous.insert("bitcoin".into(), json!({"usd": 55.0}));
    store
        .save(CURRENT_PRICES_KEY, &previous, previous.len())
        .unwrap();

    api.push_simple_price(Ok(json!(["not", "a", "mapping"])));
    let payload = extract_current_prices(&api, &store, &[bitcoin()], &currencies(&["usd"]));

    assert_eq!(payload, previous);
}

#[test]
fn current_failure_never_modifies_backup() {
    let api = MockApi::new();
    let store = temp_store("cur_preserve");

    let mut previous = CurrentPayload::new();
    previous.insert("bitcoin".into(), json!({"usd": 55.0}));
    store
        .save(CURRENT_PRICES_KEY, &previous, previous.len())
        .unwrap();
    let hash_before = store.meta(CURRENT_PRICES_KEY).unwrap().data_hash;

    api.push_simple_price(Err(ApiError::ServerError { status: 502 }));
    extract_current_prices(&api, &store, &[bitcoin()], &currencies(&["usd"]));

    let hash_after = store.meta(CURRENT_PRICES_KEY).unwrap().data_hash;
    assert_eq!(hash_before, hash_after);
}

// ─── Historical extractor ───────────────────────────────────────────

fn extractor<'a>(
    api: &'a MockApi,
    store: &'a coinflow_core::backup::BackupStore,
) -> HistoricalExtractor<'a> {
    HistoricalExtractor::new(api, store).with_delay_range((0.0, 0.0))
}

fn seed_backup(store: &coinflow_core::backup::BackupStore) -> Vec<RawOhlcRecord> {
    let sentinel = vec![RawOhlcRecord {
        coin_id: "bitcoin".into(),
        coin_name: "Bitcoin".into(),
        currency: "usd".into(),
        timestamp_ms: 1_600_000_000_000,
        open: json!(1.0),
        high: json!(2.0),
        low: json!(0.5),
        close: json!(1.5),
    }];
    store
        .save(HISTORICAL_OHLC_KEY, &sentinel, sentinel.len())
        .unwrap();
    sentinel
}

#[test]
fn historical_all_success_commits_and_overwrites_backup() {
    let api = MockApi::new();
    let store = temp_store("hist_ok");
    api.push_ohlc(Ok(valid_ohlc_rows(12)));
    api.push_ohlc(Ok(valid_ohlc_rows(15)));

    let rows = extractor(&api, &store).extract(&[bitcoin(), ethereum()], "usd", 30);

    assert_eq!(rows.len(), 27);
    assert!(rows.iter().take(12).all(|r| r.coin_id == "bitcoin"));
    assert!(rows.iter().skip(12).all(|r| r.coin_id == "ethereum"));

    // Backup holds exactly the newly fetched, row-validated records
    let backed_up: Vec<RawOhlcRecord> = store.load(HISTORICAL_OHLC_KEY).unwrap();
    assert_eq!(backed_up, rows);
}

#[test]
fn historical_single_failure_returns_backup_verbatim() {
    let api = MockApi::new();
    let store = temp_store("hist_partial");
    let sentinel = seed_backup(&store);
    let hash_before = store.meta(HISTORICAL_OHLC_KEY).unwrap().data_hash;

    api.push_ohlc(Ok(valid_ohlc_rows(12)));
    api.push_ohlc(Err(ApiError::RateLimited));

    let rows = extractor(&api, &store).extract(&[bitcoin(), ethereum()], "usd", 30);

    // One rate-limited coin invalidates the whole batch
    assert_eq!(rows, sentinel);

    // ...and the backup file was not overwritten
    let hash_after = store.meta(HISTORICAL_OHLC_KEY).unwrap().data_hash;
    assert_eq!(hash_before, hash_after);
}

#[test]
fn historical_failure_without_backup_returns_empty() {
    let api = MockApi::new();
    let store = temp_store("hist_empty");
    api.push_ohlc(Err(ApiError::Timeout));

    let rows = extractor(&api, &store).extract(&[bitcoin()], "usd", 30);

    assert!(rows.is_empty());
    assert!(!store.exists(HISTORICAL_OHLC_KEY));
}

#[test]
fn historical_short_response_marks_coin_failed() {
    let api = MockApi::new();
    let store = temp_store("hist_short");
    let sentinel = seed_backup(&store);

    // 9 rows is below the 10-row minimum
    api.push_ohlc(Ok(valid_ohlc_rows(9)));

    let rows = extractor(&api, &store).extract(&[bitcoin()], "usd", 30);
    assert_eq!(rows, sentinel);
}

#[test]
fn historical_non_array_response_marks_coin_failed() {
    let api = MockApi::new();
    let store = temp_store("hist_shape");
    api.push_ohlc(Ok(json!({"error": "expired api key"})));

    let rows = extractor(&api, &store).extract(&[bitcoin()], "usd", 30);
    assert!(rows.is_empty());
}

// ─── Strict backup refreshes ────────────────────────────────────────

#[test]
fn strict_current_refresh_fails_loudly_instead_of_serving_stale_backup() {
    let api = MockApi::new();
    let store = temp_store("refresh_cur_fail");

    let mut previous = CurrentPayload::new();
    previous.insert("bitcoin".into(), json!({"usd": 55.0}));
    store
        .save(CURRENT_PRICES_KEY, &previous, previous.len())
        .unwrap();
    let hash_before = store.meta(CURRENT_PRICES_KEY).unwrap().data_hash;

    api.push_simple_price(Err(ApiError::Timeout));
    let result = refresh_current_backup(&api, &store, &[bitcoin()], &currencies(&["usd"]));

    // No silent success: the error surfaces and the stale snapshot on
    // disk is byte-identical
    assert!(result.is_err());
    let hash_after = store.meta(CURRENT_PRICES_KEY).unwrap().data_hash;
    assert_eq!(hash_before, hash_after);
}

#[test]
fn strict_current_refresh_rejects_non_object_response() {
    let api = MockApi::new();
    let store = temp_store("refresh_cur_shape");
    api.push_simple_price(Ok(json!(["not", "a", "mapping"])));

    let result = refresh_current_backup(&api, &store, &[bitcoin()], &currencies(&["usd"]));

    assert!(result.is_err());
    assert!(!store.exists(CURRENT_PRICES_KEY));
}

#[test]
fn strict_current_refresh_writes_backup_on_success() {
    let api = MockApi::new();
    let store = temp_store("refresh_cur_ok");
    api.push_simple_price(Ok(json!({"bitcoin": {"usd": 100.0}})));

    let payload = refresh_current_backup(&api, &store, &[bitcoin()], &currencies(&["usd"]))
        .expect("refresh should succeed");

    let backed_up: CurrentPayload = store.load(CURRENT_PRICES_KEY).unwrap();
    assert_eq!(backed_up, payload);
}

#[test]
fn strict_historical_refresh_errors_on_any_coin_failure() {
    let api = MockApi::new();
    let store = temp_store("refresh_hist_fail");
    seed_backup(&store);
    let hash_before = store.meta(HISTORICAL_OHLC_KEY).unwrap().data_hash;

    api.push_ohlc(Ok(valid_ohlc_rows(12)));
    api.push_ohlc(Err(ApiError::RateLimited));

    let result = extractor(&api, &store).refresh_backup(&[bitcoin(), ethereum()], "usd", 30);

    let err = result.unwrap_err();
    assert!(err.to_string().contains("ethereum"));
    let hash_after = store.meta(HISTORICAL_OHLC_KEY).unwrap().data_hash;
    assert_eq!(hash_before, hash_after);
}

#[test]
fn strict_historical_refresh_commits_on_success() {
    let api = MockApi::new();
    let store = temp_store("refresh_hist_ok");
    api.push_ohlc(Ok(valid_ohlc_rows(12)));

    let rows = extractor(&api, &store)
        .refresh_backup(&[bitcoin()], "usd", 30)
        .expect("refresh should succeed");

    assert_eq!(rows.len(), 12);
    let backed_up: Vec<RawOhlcRecord> = store.load(HISTORICAL_OHLC_KEY).unwrap();
    assert_eq!(backed_up, rows);
}

#[test]
fn historical_malformed_rows_are_skipped_without_failing_the_coin() {
    let api = MockApi::new();
    let store = temp_store("hist_malformed");

    let mut rows_json = match valid_ohlc_rows(10) {
        serde_json::Value::Array(rows) => rows,
        _ => unreachable!(),
    };
    rows_json.push(json!([1, 2, 3])); // wrong arity
    rows_json.push(json!("junk")); // not an array
    api.push_ohlc(Ok(serde_json::Value::Array(rows_json)));

    let rows = extractor(&api, &store).extract(&[bitcoin()], "usd", 30);

    // 12 raw rows clear the threshold; the 2 malformed ones are dropped
    assert_eq!(rows.len(), 10);
    assert!(store.exists(HISTORICAL_OHLC_KEY));
}
