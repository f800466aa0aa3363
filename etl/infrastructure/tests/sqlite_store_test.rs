use std::collections::BTreeSet;

use chrono::{NaiveDate, TimeZone, Utc};
use etl_application::store::RateStore;
use etl_domain::{build_calendar, CurrencyRow, DateKeyRange, FactRow};
use etl_infrastructure::SqliteRateStore;
use rust_decimal_macros::dec;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

async fn fresh_store() -> SqliteRateStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().in_memory(true))
        .await
        .expect("in-memory sqlite");
    let store = SqliteRateStore::new(pool);
    store.ensure_schema().await.expect("schema");
    store
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn fact(date: NaiveDate, target: &str, rate: &str, id: i64) -> FactRow {
    let mut row = FactRow::new(
        date,
        "AUD",
        target,
        rate.parse().unwrap(),
        Some(1_704_067_199),
        Some(Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap()),
    )
    .unwrap();
    row.assign_id(id);
    row
}

#[tokio::test]
async fn ensure_schema_is_idempotent() {
    let store = fresh_store().await;
    store.ensure_schema().await.expect("second call");
}

#[tokio::test]
async fn append_and_read_back_preserves_rates_exactly() {
    let store = fresh_store().await;
    store
        .append_facts(vec![
            fact(day(1), "USD", "0.654322", 1),
            fact(day(1), "EUR", "0.60", 2),
            fact(day(2), "USD", "0.66", 3),
        ])
        .await
        .unwrap();

    let range = DateKeyRange {
        start: 20240101,
        end: 20240101,
    };
    let rows = store.facts_in_range(range).await.unwrap();
    assert_eq!(rows.len(), 2);
    // Ordered by (date_key, target).
    assert_eq!(rows[0].target_currency(), "EUR");
    assert_eq!(rows[1].target_currency(), "USD");
    assert_eq!(rows[1].rate(), dec!(0.654322));
    assert_eq!(rows[1].timestamp(), Some(1_704_067_199));
    assert_eq!(
        rows[1].fetched_at(),
        Some(Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap())
    );
    assert_eq!(rows[1].id(), Some(1));
}

#[tokio::test]
async fn existing_keys_only_cover_the_requested_window() {
    let store = fresh_store().await;
    store
        .append_facts(vec![
            fact(day(1), "USD", "0.65", 1),
            fact(day(5), "USD", "0.66", 2),
            fact(day(9), "USD", "0.67", 3),
        ])
        .await
        .unwrap();

    let keys = store
        .existing_keys(DateKeyRange {
            start: 20240104,
            end: 20240106,
        })
        .await
        .unwrap();

    assert_eq!(keys.len(), 1);
    assert!(keys.iter().all(|k| k.date_key == 20240105));
}

#[tokio::test]
async fn max_fact_id_defaults_to_zero() {
    let store = fresh_store().await;
    assert_eq!(store.max_fact_id().await.unwrap(), 0);

    store
        .append_facts(vec![fact(day(1), "USD", "0.65", 17)])
        .await
        .unwrap();
    assert_eq!(store.max_fact_id().await.unwrap(), 17);
}

#[tokio::test]
async fn duplicate_triple_is_rejected_by_the_schema() {
    let store = fresh_store().await;
    store
        .append_facts(vec![fact(day(1), "USD", "0.65", 1)])
        .await
        .unwrap();

    let err = store
        .append_facts(vec![fact(day(1), "USD", "0.99", 2)])
        .await;
    assert!(err.is_err());

    // The failed transaction must not have committed anything.
    let rows = store
        .facts_in_range(DateKeyRange {
            start: 20240101,
            end: 20240101,
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].rate(), dec!(0.65));
}

#[tokio::test]
async fn append_is_all_or_nothing() {
    let store = fresh_store().await;
    store
        .append_facts(vec![fact(day(1), "USD", "0.65", 1)])
        .await
        .unwrap();

    // Second row in the batch collides; the first must roll back with it.
    let err = store
        .append_facts(vec![
            fact(day(2), "USD", "0.66", 2),
            fact(day(1), "USD", "0.99", 3),
        ])
        .await;
    assert!(err.is_err());

    let keys = store
        .distinct_date_keys()
        .await
        .unwrap();
    assert_eq!(keys, vec![20240101]);
}

#[tokio::test]
async fn replace_calendar_truncates_and_reloads() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().in_memory(true))
        .await
        .expect("in-memory sqlite");
    let store = SqliteRateStore::new(pool.clone());
    store.ensure_schema().await.unwrap();

    let first: BTreeSet<NaiveDate> = [day(1), day(2)].into();
    store
        .replace_calendar(build_calendar(&first))
        .await
        .unwrap();

    let second: BTreeSet<NaiveDate> = [day(3)].into();
    store
        .replace_calendar(build_calendar(&second))
        .await
        .unwrap();

    let keys: Vec<i64> = sqlx::query_scalar("SELECT date_key FROM dim_time ORDER BY date_key")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(keys, vec![20240103]);
}

#[tokio::test]
async fn currency_keys_are_stable_across_reseeding() {
    let store = fresh_store().await;
    store
        .insert_currencies(vec![
            CurrencyRow::new(1, "EUR", "Euro"),
            CurrencyRow::new(2, "USD", "US Dollar"),
        ])
        .await
        .unwrap();

    // Re-inserting an existing code under a new key is ignored.
    store
        .insert_currencies(vec![
            CurrencyRow::new(3, "EUR", "Euro Again"),
            CurrencyRow::new(4, "GBP", "British Pound"),
        ])
        .await
        .unwrap();

    let rows = store.currencies().await.unwrap();
    assert_eq!(
        rows,
        vec![
            CurrencyRow::new(1, "EUR", "Euro"),
            CurrencyRow::new(2, "USD", "US Dollar"),
            CurrencyRow::new(4, "GBP", "British Pound"),
        ]
    );
}
