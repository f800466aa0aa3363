use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use etl_application::{
    CurrencySeed, CurrencyService, CurrencyServiceImpl, RateStore, StoreError,
};
use etl_domain::{CalendarRow, CurrencyRow, DateKeyRange, FactKey, FactRow};
use tokio::sync::Mutex;

#[tokio::test]
async fn new_codes_get_the_next_unused_keys() {
    let store = Arc::new(CurrencyStore::with_rows(vec![
        CurrencyRow::new(1, "EUR", "Euro"),
        CurrencyRow::new(2, "AUD", "Australian Dollar"),
    ]));
    let service = CurrencyServiceImpl::new(store.clone());

    let report = service
        .seed(vec![
            CurrencySeed::new("EUR", "Euro"),
            CurrencySeed::new("USD", "US Dollar"),
            CurrencySeed::new("GBP", "British Pound"),
        ])
        .await
        .unwrap();

    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 1);

    let rows = store.rows.lock().await.clone();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[2], CurrencyRow::new(3, "USD", "US Dollar"));
    assert_eq!(rows[3], CurrencyRow::new(4, "GBP", "British Pound"));
}

#[tokio::test]
async fn reseeding_preserves_existing_keys() {
    let store = Arc::new(CurrencyStore::with_rows(Vec::new()));
    let service = CurrencyServiceImpl::new(store.clone());

    let entries = vec![
        CurrencySeed::new("EUR", "Euro"),
        CurrencySeed::new("USD", "US Dollar"),
    ];
    service.seed(entries.clone()).await.unwrap();
    let first_pass = store.rows.lock().await.clone();

    let report = service.seed(entries).await.unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(*store.rows.lock().await, first_pass);
}

#[tokio::test]
async fn malformed_and_duplicate_input_codes_are_dropped() {
    let store = Arc::new(CurrencyStore::with_rows(Vec::new()));
    let service = CurrencyServiceImpl::new(store.clone());

    let report = service
        .seed(vec![
            CurrencySeed::new("usd", "US Dollar"),
            CurrencySeed::new("USD", "US Dollar again"),
            CurrencySeed::new("X1", "Bogus"),
            CurrencySeed::new("", ""),
        ])
        .await
        .unwrap();

    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped, 3);

    let rows = store.rows.lock().await.clone();
    assert_eq!(rows, vec![CurrencyRow::new(1, "USD", "US Dollar")]);
}

struct CurrencyStore {
    rows: Mutex<Vec<CurrencyRow>>,
}

impl CurrencyStore {
    fn with_rows(rows: Vec<CurrencyRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }
}

#[async_trait]
impl RateStore for CurrencyStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn existing_keys(&self, _range: DateKeyRange) -> Result<HashSet<FactKey>, StoreError> {
        Ok(HashSet::new())
    }

    async fn max_fact_id(&self) -> Result<i64, StoreError> {
        Ok(0)
    }

    async fn append_facts(&self, _rows: Vec<FactRow>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn facts_in_range(&self, _range: DateKeyRange) -> Result<Vec<FactRow>, StoreError> {
        Ok(Vec::new())
    }

    async fn distinct_date_keys(&self) -> Result<Vec<i64>, StoreError> {
        Ok(Vec::new())
    }

    async fn replace_calendar(&self, _rows: Vec<CalendarRow>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn currencies(&self) -> Result<Vec<CurrencyRow>, StoreError> {
        Ok(self.rows.lock().await.clone())
    }

    async fn insert_currencies(&self, rows: Vec<CurrencyRow>) -> Result<(), StoreError> {
        self.rows.lock().await.extend(rows);
        Ok(())
    }
}
