use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use etl_application::store::{RateStore, StoreError};
use etl_domain::{date_from_key, CalendarRow, CurrencyRow, DateKeyRange, FactKey, FactRow};
use rust_decimal::Decimal;
use shaku::Component;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row;

const CREATE_FACT_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS fact_exchange_rate (
    id BIGINT PRIMARY KEY,
    date_key BIGINT NOT NULL,
    base_currency CHAR(3) NOT NULL,
    target_currency CHAR(3) NOT NULL,
    rate NUMERIC(18, 6) NOT NULL,
    timestamp BIGINT,
    fetched_at TIMESTAMPTZ,
    UNIQUE (date_key, base_currency, target_currency)
)";

const CREATE_TIME_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS dim_time (
    date_key BIGINT PRIMARY KEY,
    date DATE NOT NULL,
    day_of_week BIGINT NOT NULL,
    day_name TEXT NOT NULL,
    is_weekend BOOLEAN NOT NULL,
    week_start_date DATE NOT NULL,
    month BIGINT NOT NULL,
    month_name TEXT NOT NULL,
    quarter BIGINT NOT NULL,
    year BIGINT NOT NULL
)";

const CREATE_CURRENCY_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS dim_currency (
    currency_key BIGINT PRIMARY KEY,
    currency_code CHAR(3) NOT NULL UNIQUE,
    currency_name TEXT NOT NULL
)";

fn default_pool() -> PgPool {
    PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy_with(PgConnectOptions::new())
}

/// Warehouse flavor of the store. Identical contract to the embedded
/// adapter; the merge policy above the `RateStore` port stays the only place
/// dedup decisions are made.
#[derive(Component)]
#[shaku(interface = RateStore)]
pub struct PostgresRateStore {
    #[shaku(default = default_pool())]
    pool: PgPool,
}

impl PostgresRateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl RateStore for PostgresRateStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in [CREATE_FACT_TABLE, CREATE_TIME_TABLE, CREATE_CURRENCY_TABLE] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        }
        Ok(())
    }

    async fn existing_keys(&self, range: DateKeyRange) -> Result<HashSet<FactKey>, StoreError> {
        let rows = sqlx::query(
            "SELECT date_key, TRIM(base_currency) AS base_currency, \
                    TRIM(target_currency) AS target_currency \
             FROM fact_exchange_rate WHERE date_key BETWEEN $1 AND $2",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(FactKey {
                    date_key: row.try_get("date_key").map_err(backend)?,
                    base_currency: row.try_get("base_currency").map_err(backend)?,
                    target_currency: row.try_get("target_currency").map_err(backend)?,
                })
            })
            .collect()
    }

    async fn max_fact_id(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COALESCE(MAX(id), 0) FROM fact_exchange_rate")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        row.try_get(0).map_err(backend)
    }

    async fn append_facts(&self, rows: Vec<FactRow>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for row in &rows {
            sqlx::query(
                "INSERT INTO fact_exchange_rate \
                 (id, date_key, base_currency, target_currency, rate, timestamp, fetched_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(row.id())
            .bind(row.date_key())
            .bind(row.base_currency())
            .bind(row.target_currency())
            .bind(row.rate())
            .bind(row.timestamp())
            .bind(row.fetched_at())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)
    }

    async fn facts_in_range(&self, range: DateKeyRange) -> Result<Vec<FactRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, date_key, TRIM(base_currency) AS base_currency, \
                    TRIM(target_currency) AS target_currency, rate, timestamp, fetched_at \
             FROM fact_exchange_rate WHERE date_key BETWEEN $1 AND $2 \
             ORDER BY date_key, target_currency",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                let date_key: i64 = row.try_get("date_key").map_err(backend)?;
                let date = date_from_key(date_key)
                    .ok_or_else(|| StoreError::CorruptRow(format!("date_key {date_key}")))?;
                let rate: Decimal = row.try_get("rate").map_err(backend)?;
                let base: String = row.try_get("base_currency").map_err(backend)?;
                let target: String = row.try_get("target_currency").map_err(backend)?;
                let timestamp: Option<i64> = row.try_get("timestamp").map_err(backend)?;
                let fetched_at: Option<DateTime<Utc>> =
                    row.try_get("fetched_at").map_err(backend)?;

                let mut fact = FactRow::new(date, &base, &target, rate, timestamp, fetched_at)
                    .map_err(|e| StoreError::CorruptRow(e.to_string()))?;
                let id: i64 = row.try_get("id").map_err(backend)?;
                fact.assign_id(id);
                Ok(fact)
            })
            .collect()
    }

    async fn distinct_date_keys(&self) -> Result<Vec<i64>, StoreError> {
        let rows =
            sqlx::query("SELECT DISTINCT date_key FROM fact_exchange_rate ORDER BY date_key")
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;
        rows.into_iter()
            .map(|row| row.try_get(0).map_err(backend))
            .collect()
    }

    async fn replace_calendar(&self, rows: Vec<CalendarRow>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query("TRUNCATE dim_time")
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        for row in &rows {
            sqlx::query(
                "INSERT INTO dim_time \
                 (date_key, date, day_of_week, day_name, is_weekend, week_start_date, \
                  month, month_name, quarter, year) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(row.date_key)
            .bind(row.date)
            .bind(i64::from(row.day_of_week))
            .bind(&row.day_name)
            .bind(row.is_weekend)
            .bind(row.week_start_date)
            .bind(i64::from(row.month))
            .bind(&row.month_name)
            .bind(i64::from(row.quarter))
            .bind(i64::from(row.year))
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)
    }

    async fn currencies(&self) -> Result<Vec<CurrencyRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT currency_key, TRIM(currency_code) AS currency_code, currency_name \
             FROM dim_currency ORDER BY currency_key",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(CurrencyRow {
                    currency_key: row.try_get("currency_key").map_err(backend)?,
                    currency_code: row.try_get("currency_code").map_err(backend)?,
                    currency_name: row.try_get("currency_name").map_err(backend)?,
                })
            })
            .collect()
    }

    async fn insert_currencies(&self, rows: Vec<CurrencyRow>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for row in &rows {
            sqlx::query(
                "INSERT INTO dim_currency (currency_key, currency_code, currency_name) \
                 VALUES ($1, $2, $3) ON CONFLICT (currency_code) DO NOTHING",
            )
            .bind(row.currency_key)
            .bind(&row.currency_code)
            .bind(&row.currency_name)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)
    }
}
