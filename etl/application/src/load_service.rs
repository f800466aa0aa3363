use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use shaku::{Component, Interface};
use tracing::{info, warn};
use uuid::Uuid;

use crate::merge::{IncrementalMerger, MergeError, MergeOutcome};
use crate::payload_cache::PayloadCache;
use crate::store::{RateStore, StoreError};
use etl_domain::{build_calendar, date_from_key, flatten_all, CalendarIndex};

#[async_trait]
pub trait LoadService: Interface {
    /// Flattens every cached payload, regenerates the calendar dimension,
    /// and merges the new fact rows. Idempotent: running it twice on the
    /// same cache inserts nothing the second time.
    async fn load(&self) -> Result<LoadReport, LoadError>;

    /// Regenerates dim_time from the date_keys currently present in the
    /// fact table.
    async fn rebuild_calendar(&self) -> Result<usize, LoadError>;
}

#[derive(Component)]
#[shaku(interface = LoadService)]
pub struct LoadServiceImpl {
    #[shaku(inject)]
    cache: Arc<dyn PayloadCache>,

    #[shaku(inject)]
    store: Arc<dyn RateStore>,
}

impl LoadServiceImpl {
    pub fn new(cache: Arc<dyn PayloadCache>, store: Arc<dyn RateStore>) -> Self {
        Self { cache, store }
    }

    async fn stored_dates(&self) -> Result<BTreeSet<NaiveDate>, StoreError> {
        let keys = self.store.distinct_date_keys().await?;
        Ok(keys.into_iter().filter_map(date_from_key).collect())
    }
}

#[async_trait]
impl LoadService for LoadServiceImpl {
    async fn load(&self) -> Result<LoadReport, LoadError> {
        let run_id = Uuid::new_v4().to_string();
        let payloads = self.cache.payloads().await;
        let outcome = flatten_all(&payloads);
        if outcome.skipped_payloads > 0 {
            warn!(
                skipped = outcome.skipped_payloads,
                "dropped malformed cache entries"
            );
        }

        self.store.ensure_schema().await?;

        if outcome.rows.is_empty() {
            info!(run_id = %run_id, "no candidate rows to load");
            return Ok(LoadReport {
                run_id,
                candidate_rows: 0,
                malformed_payloads: outcome.skipped_payloads,
                calendar_rows: 0,
                merge: MergeOutcome::default(),
            });
        }

        // The calendar must cover the union of what the store already holds
        // and what is about to land, and it is written before any fact row.
        let mut dates = self.stored_dates().await?;
        dates.extend(outcome.rows.iter().map(|row| row.date()));
        let calendar = build_calendar(&dates);
        let calendar_rows = calendar.len();
        let index = CalendarIndex::from_rows(&calendar);
        self.store.replace_calendar(calendar).await?;
        info!(run_id = %run_id, calendar_rows, "calendar dimension rebuilt");

        let candidate_rows = outcome.rows.len();
        let merger = IncrementalMerger::new(self.store.clone());
        let merge = merger.merge(outcome.rows, &index).await?;

        info!(
            run_id = %run_id,
            candidates = candidate_rows,
            inserted = merge.inserted,
            duplicates = merge.duplicates,
            "load complete"
        );

        Ok(LoadReport {
            run_id,
            candidate_rows,
            malformed_payloads: outcome.skipped_payloads,
            calendar_rows,
            merge,
        })
    }

    async fn rebuild_calendar(&self) -> Result<usize, LoadError> {
        self.store.ensure_schema().await?;
        let dates = self.stored_dates().await?;
        if dates.is_empty() {
            return Err(LoadError::EmptyFactTable);
        }

        let rows = build_calendar(&dates);
        let count = rows.len();
        self.store.replace_calendar(rows).await?;
        info!(rows = count, "calendar dimension rebuilt from fact table");
        Ok(count)
    }
}

#[derive(Debug)]
pub struct LoadReport {
    pub run_id: String,
    pub candidate_rows: usize,
    pub malformed_payloads: usize,
    pub calendar_rows: usize,
    pub merge: MergeOutcome,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Fact table has no rows; nothing to rebuild")]
    EmptyFactTable,
}
