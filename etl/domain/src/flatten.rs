use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::fact::FactRow;
use crate::payload::RatePayload;

/// Result of flattening a batch of payloads. `skipped_payloads` counts
/// entries that were dropped whole: missing base/date, unparseable date, or
/// a `rates` field that is not a JSON object.
#[derive(Debug, Default)]
pub struct FlattenOutcome {
    pub rows: Vec<FactRow>,
    pub skipped_payloads: usize,
}

/// Flattens one nested payload into one candidate fact row per target
/// currency, sorted by target. Malformed payloads yield `None`; one bad
/// record never aborts processing of the rest of the batch.
pub fn flatten_payload(payload: &RatePayload) -> Option<Vec<FactRow>> {
    let base = payload.base.as_deref()?;
    let date_str = payload.date.as_deref()?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
    let rates = match payload.rates.as_ref()? {
        Value::Object(map) => map,
        _ => return None,
    };

    let fetched_at = payload
        .fetched_at
        .as_deref()
        .and_then(parse_fetched_at);

    let mut rows: Vec<FactRow> = rates
        .iter()
        .filter_map(|(target, value)| {
            let rate = decimal_from_json(value)?;
            FactRow::new(date, base, target, rate, payload.timestamp, fetched_at).ok()
        })
        .collect();

    rows.sort_by(|a, b| a.target_currency().cmp(b.target_currency()));
    Some(rows)
}

/// Flattens a whole cache worth of payloads, sorted by
/// `(date, target_currency)` for deterministic downstream diffing.
pub fn flatten_all(payloads: &[RatePayload]) -> FlattenOutcome {
    let mut outcome = FlattenOutcome::default();

    for payload in payloads {
        match flatten_payload(payload) {
            Some(rows) => outcome.rows.extend(rows),
            None => outcome.skipped_payloads += 1,
        }
    }

    outcome.rows.sort_by(|a, b| {
        (a.date(), a.target_currency()).cmp(&(b.date(), b.target_currency()))
    });
    outcome
}

fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        // Parsing the number's literal form keeps 0.65 exact instead of
        // routing it through f64.
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

fn parse_fetched_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> RatePayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_flatten_yields_sorted_rows() {
        let p = payload(json!({
            "base": "AUD",
            "date": "2024-01-01",
            "rates": {"USD": 0.65, "EUR": 0.60}
        }));

        let rows = flatten_payload(&p).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].target_currency(), "EUR");
        assert_eq!(rows[0].rate(), dec!(0.60));
        assert_eq!(rows[1].target_currency(), "USD");
        assert_eq!(rows[1].rate(), dec!(0.65));
        assert!(rows.iter().all(|r| r.base_currency() == "AUD"));
    }

    #[test]
    fn test_missing_base_skipped() {
        let p = payload(json!({"date": "2024-01-01", "rates": {"USD": 0.65}}));
        assert!(flatten_payload(&p).is_none());
    }

    #[test]
    fn test_non_mapping_rates_skipped() {
        let p = payload(json!({"base": "AUD", "date": "2024-01-01", "rates": [0.65]}));
        assert!(flatten_payload(&p).is_none());
    }

    #[test]
    fn test_unparseable_date_skipped() {
        let p = payload(json!({"base": "AUD", "date": "01/01/2024", "rates": {"USD": 0.65}}));
        assert!(flatten_payload(&p).is_none());
    }

    #[test]
    fn test_bad_rate_entry_dropped_siblings_kept() {
        let p = payload(json!({
            "base": "AUD",
            "date": "2024-01-01",
            "rates": {"USD": 0.65, "EUR": "not-a-number", "XXX": -1.0}
        }));

        let rows = flatten_payload(&p).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].target_currency(), "USD");
    }

    #[test]
    fn test_flatten_all_sorts_and_counts_malformed() {
        let batch = vec![
            payload(json!({"base": "AUD", "date": "2024-01-02", "rates": {"USD": 0.66}})),
            payload(json!({"rates": {"USD": 0.65}})),
            payload(json!({
                "base": "AUD",
                "date": "2024-01-01",
                "rates": {"USD": 0.65, "EUR": 0.60},
                "timestamp": 1704067199,
                "fetched_at": "2024-01-02T08:00:00+08:00"
            })),
        ];

        let outcome = flatten_all(&batch);
        assert_eq!(outcome.skipped_payloads, 1);
        assert_eq!(outcome.rows.len(), 3);

        let keys: Vec<(NaiveDate, String)> = outcome
            .rows
            .iter()
            .map(|r| (r.date(), r.target_currency().to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), "EUR".into()),
                (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), "USD".into()),
                (NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), "USD".into()),
            ]
        );

        assert_eq!(outcome.rows[0].timestamp(), Some(1704067199));
        assert!(outcome.rows[0].fetched_at().is_some());
    }
}
