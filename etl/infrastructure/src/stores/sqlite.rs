use std::collections::HashSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use etl_application::store::{RateStore, StoreError};
use etl_domain::{date_from_key, CalendarRow, CurrencyRow, DateKeyRange, FactKey, FactRow};
use rust_decimal::Decimal;
use shaku::Component;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

const CREATE_FACT_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS fact_exchange_rate (
    id INTEGER PRIMARY KEY,
    date_key INTEGER NOT NULL,
    base_currency TEXT NOT NULL,
    target_currency TEXT NOT NULL,
    rate TEXT NOT NULL,
    timestamp INTEGER,
    fetched_at TEXT,
    UNIQUE (date_key, base_currency, target_currency)
)";

const CREATE_TIME_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS dim_time (
    date_key INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    day_of_week INTEGER NOT NULL,
    day_name TEXT NOT NULL,
    is_weekend INTEGER NOT NULL,
    week_start_date TEXT NOT NULL,
    month INTEGER NOT NULL,
    month_name TEXT NOT NULL,
    quarter INTEGER NOT NULL,
    year INTEGER NOT NULL
)";

const CREATE_CURRENCY_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS dim_currency (
    currency_key INTEGER PRIMARY KEY,
    currency_code TEXT NOT NULL UNIQUE,
    currency_name TEXT NOT NULL
)";

fn default_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_lazy_with(SqliteConnectOptions::new().in_memory(true))
}

/// Embedded store. SQLite has no native fixed-point type, so rates are
/// persisted as their decimal text form rather than REAL.
#[derive(Component)]
#[shaku(interface = RateStore)]
pub struct SqliteRateStore {
    #[shaku(default = default_pool())]
    pool: SqlitePool,
}

impl SqliteRateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl RateStore for SqliteRateStore {
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
            "SELECT date_key, base_currency, target_currency \
             FROM fact_exchange_rate WHERE date_key BETWEEN ?1 AND ?2",
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
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(row.id())
            .bind(row.date_key())
            .bind(row.base_currency())
            .bind(row.target_currency())
            .bind(row.rate().to_string())
            .bind(row.timestamp())
            .bind(row.fetched_at().map(|dt| dt.to_rfc3339()))
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)
    }

    async fn facts_in_range(&self, range: DateKeyRange) -> Result<Vec<FactRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, date_key, base_currency, target_currency, rate, timestamp, fetched_at \
             FROM fact_exchange_rate WHERE date_key BETWEEN ?1 AND ?2 \
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
                let rate_text: String = row.try_get("rate").map_err(backend)?;
                let rate = Decimal::from_str(&rate_text)
                    .map_err(|_| StoreError::CorruptRow(format!("rate {rate_text:?}")))?;
                let base: String = row.try_get("base_currency").map_err(backend)?;
                let target: String = row.try_get("target_currency").map_err(backend)?;
                let timestamp: Option<i64> = row.try_get("timestamp").map_err(backend)?;
                let fetched_at: Option<String> = row.try_get("fetched_at").map_err(backend)?;
                let fetched_at = fetched_at.as_deref().and_then(|raw| {
                    DateTime::parse_from_rfc3339(raw)
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc))
                });

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
        sqlx::query("DELETE FROM dim_time")
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        for row in &rows {
            sqlx::query(
                "INSERT INTO dim_time \
                 (date_key, date, day_of_week, day_name, is_weekend, week_start_date, \
                  month, month_name, quarter, year) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
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
            "SELECT currency_key, currency_code, currency_name \
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
                 VALUES (?1, ?2, ?3) ON CONFLICT (currency_code) DO NOTHING",
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
