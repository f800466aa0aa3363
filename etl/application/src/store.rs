use std::collections::HashSet;

use async_trait::async_trait;
use etl_domain::{CalendarRow, CurrencyRow, DateKeyRange, FactKey, FactRow};
use shaku::Interface;

/// Relational sink for the star schema. Two adapters exist (embedded SQLite
/// and the Postgres warehouse flavor); the merge policy lives above this
/// trait so the dedup logic cannot drift between them.
#[async_trait]
pub trait RateStore: Interface {
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Existing dedup triples whose date_key falls inside `range`. Callers
    /// pass the window spanned by their candidates; implementations must not
    /// scan beyond it.
    async fn existing_keys(&self, range: DateKeyRange) -> Result<HashSet<FactKey>, StoreError>;

    async fn max_fact_id(&self) -> Result<i64, StoreError>;

    /// Appends rows in one transaction: either all land or none do.
    async fn append_facts(&self, rows: Vec<FactRow>) -> Result<(), StoreError>;

    async fn facts_in_range(&self, range: DateKeyRange) -> Result<Vec<FactRow>, StoreError>;

    async fn distinct_date_keys(&self) -> Result<Vec<i64>, StoreError>;

    /// Truncate-and-load. The calendar dimension is always fully
    /// regenerated, never incrementally patched.
    async fn replace_calendar(&self, rows: Vec<CalendarRow>) -> Result<(), StoreError>;

    async fn currencies(&self) -> Result<Vec<CurrencyRow>, StoreError>;

    async fn insert_currencies(&self, rows: Vec<CurrencyRow>) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Corrupt stored row: {0}")]
    CorruptRow(String),
}
