//! Transformers: validated, schema-consistent tables from raw payloads.
//!
//! Transformers only ever read extractor output (fresh or backup-recovered)
//! and drop bad data at the row level; they never fail a whole batch over a
//! data-quality issue.

pub mod current;
pub mod historical;

pub use current::transform_current_prices;
pub use historical::{transform_historical_prices, HistoricalTables};

use serde_json::Value;

/// Coerce a raw JSON value to f64: numbers and numeric strings pass,
/// everything else (null, bool, arrays, objects, junk strings) does not.
pub(crate) fn coerce_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce_f64(&json!(1.5)), Some(1.5));
        assert_eq!(coerce_f64(&json!(42)), Some(42.0));
        assert_eq!(coerce_f64(&json!("3.25")), Some(3.25));
        assert_eq!(coerce_f64(&json!(" 7 ")), Some(7.0));
    }

    #[test]
    fn coerce_rejects_everything_else() {
        assert_eq!(coerce_f64(&json!(null)), None);
        assert_eq!(coerce_f64(&json!(true)), None);
        assert_eq!(coerce_f64(&json!("n/a")), None);
        assert_eq!(coerce_f64(&json!([1.0])), None);
        assert_eq!(coerce_f64(&json!({"usd": 1.0})), None);
    }
}
