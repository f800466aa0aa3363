use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::calendar::date_key;
use crate::currency::normalize_code;

/// Fractional digits kept on a stored rate. Rounding is half-up.
pub const RATE_SCALE: u32 = 6;

/// One (date, base, target) rate observation. The triple is unique across
/// the whole store; a later fetch for an already-present triple is dropped,
/// never overwritten. The surrogate `id` is assigned at merge time.
#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    id: Option<i64>,
    date: NaiveDate,
    base_currency: String,
    target_currency: String,
    rate: Decimal,
    timestamp: Option<i64>,
    fetched_at: Option<DateTime<Utc>>,
}

impl FactRow {
    pub fn new(
        date: NaiveDate,
        base_currency: &str,
        target_currency: &str,
        rate: Decimal,
        timestamp: Option<i64>,
        fetched_at: Option<DateTime<Utc>>,
    ) -> Result<Self, FactRowError> {
        let base_currency = normalize_code(base_currency)
            .ok_or_else(|| FactRowError::InvalidCurrencyCode(base_currency.to_string()))?;
        let target_currency = normalize_code(target_currency)
            .ok_or_else(|| FactRowError::InvalidCurrencyCode(target_currency.to_string()))?;

        if rate <= Decimal::ZERO {
            return Err(FactRowError::InvalidRate(rate.to_string()));
        }

        Ok(Self {
            id: None,
            date,
            base_currency,
            target_currency,
            rate: rate.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero),
            timestamp,
            fetched_at,
        })
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn date_key(&self) -> i64 {
        date_key(self.date)
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    pub fn target_currency(&self) -> &str {
        &self.target_currency
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn key(&self) -> FactKey {
        FactKey {
            date_key: self.date_key(),
            base_currency: self.base_currency.clone(),
            target_currency: self.target_currency.clone(),
        }
    }
}

/// The dedup key: unique per fact row across the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactKey {
    pub date_key: i64,
    pub base_currency: String,
    pub target_currency: String,
}

/// Inclusive date_key window spanned by a batch of candidate rows. Existing
/// keys are only ever queried for this window, never the whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateKeyRange {
    pub start: i64,
    pub end: i64,
}

impl DateKeyRange {
    pub fn spanning(rows: &[FactRow]) -> Option<Self> {
        let start = rows.iter().map(FactRow::date_key).min()?;
        let end = rows.iter().map(FactRow::date_key).max()?;
        Some(Self { start, end })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FactRowError {
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrencyCode(String),
    #[error("Rate must be positive, got {0}")]
    InvalidRate(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_valid_fact_row() {
        let row = FactRow::new(date(2024, 1, 1), "aud", "USD", dec!(0.65), None, None).unwrap();
        assert_eq!(row.base_currency(), "AUD");
        assert_eq!(row.target_currency(), "USD");
        assert_eq!(row.date_key(), 20240101);
        assert!(row.id().is_none());
    }

    #[test]
    fn test_rate_rounded_half_up_to_six_digits() {
        let row =
            FactRow::new(date(2024, 1, 1), "AUD", "USD", dec!(0.65432155), None, None).unwrap();
        assert_eq!(row.rate(), dec!(0.654322));

        let row =
            FactRow::new(date(2024, 1, 1), "AUD", "USD", dec!(0.65432145), None, None).unwrap();
        assert_eq!(row.rate(), dec!(0.654321));
    }

    #[test]
    fn test_bad_currency_code_rejected() {
        let result = FactRow::new(date(2024, 1, 1), "AUD", "US", dec!(0.65), None, None);
        assert!(matches!(result, Err(FactRowError::InvalidCurrencyCode(_))));

        let result = FactRow::new(date(2024, 1, 1), "A1D", "USD", dec!(0.65), None, None);
        assert!(matches!(result, Err(FactRowError::InvalidCurrencyCode(_))));
    }

    #[test]
    fn test_non_positive_rate_rejected() {
        let result = FactRow::new(date(2024, 1, 1), "AUD", "USD", dec!(0), None, None);
        assert!(matches!(result, Err(FactRowError::InvalidRate(_))));
    }

    #[test]
    fn test_key_range_spans_batch() {
        let rows = vec![
            FactRow::new(date(2024, 2, 10), "AUD", "USD", dec!(0.65), None, None).unwrap(),
            FactRow::new(date(2024, 1, 5), "AUD", "EUR", dec!(0.60), None, None).unwrap(),
            FactRow::new(date(2024, 3, 1), "AUD", "GBP", dec!(0.52), None, None).unwrap(),
        ];
        let range = DateKeyRange::spanning(&rows).unwrap();
        assert_eq!(range.start, 20240105);
        assert_eq!(range.end, 20240301);

        assert!(DateKeyRange::spanning(&[]).is_none());
    }
}
