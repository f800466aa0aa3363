use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use shaku::{Component, Interface};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::payload_cache::{CacheError, PayloadCache};
use crate::ports::RateFetcher;
use crate::throttle::RequestThrottle;
use etl_domain::DateRange;

/// The provider has no rates before the euro era.
pub const EARLIEST_RATE_DATE: (i32, u32, u32) = (1999, 1, 1);

#[async_trait]
pub trait BackfillService: Interface {
    /// Chunked historical fetch over an inclusive range. Dates already in
    /// the cache are skipped, so re-invoking after an interruption continues
    /// where the previous run stopped.
    async fn backfill_range(&self, range: DateRange) -> Result<BackfillReport, BackfillError>;

    /// Daily mode: the last `days` dates ending today, single chunk.
    async fn fetch_recent(&self, days: u32) -> Result<BackfillReport, BackfillError>;
}

#[derive(Component)]
#[shaku(interface = BackfillService)]
pub struct BackfillServiceImpl {
    #[shaku(inject)]
    fetcher: Arc<dyn RateFetcher>,

    #[shaku(inject)]
    cache: Arc<dyn PayloadCache>,

    #[shaku(inject)]
    throttle: Arc<dyn RequestThrottle>,

    chunk_count: usize,
}

impl BackfillServiceImpl {
    pub fn new(
        fetcher: Arc<dyn RateFetcher>,
        cache: Arc<dyn PayloadCache>,
        throttle: Arc<dyn RequestThrottle>,
        chunk_count: usize,
    ) -> Self {
        Self {
            fetcher,
            cache,
            throttle,
            chunk_count,
        }
    }

    /// Default backfill window: `years` of history ending yesterday, clamped
    /// to the provider's earliest supported date.
    pub fn default_backfill_range(years: u32) -> DateRange {
        let end = Utc::now()
            .date_naive()
            .pred_opt()
            .expect("date underflow");
        let span_days = u64::from(years.max(1)) * 365;
        let mut start = end
            .checked_sub_days(Days::new(span_days - 1))
            .expect("date underflow");
        let (y, m, d) = EARLIEST_RATE_DATE;
        let earliest = NaiveDate::from_ymd_opt(y, m, d).expect("valid earliest date");
        if start < earliest {
            start = earliest;
        }
        DateRange::new(start, end).expect("backfill window must be valid")
    }

    async fn run(&self, range: DateRange, chunk_count: usize) -> Result<BackfillReport, BackfillError> {
        let run_id = Uuid::new_v4().to_string();
        let chunks = range.chunk(chunk_count);
        info!(
            run_id = %run_id,
            range = %range,
            chunks = chunks.len(),
            "starting rate fetch"
        );

        let mut fetched = 0usize;
        let mut skipped_cached = 0usize;
        let mut failed_dates: Vec<(NaiveDate, String)> = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let mut chunk_fetched = 0usize;
            for date in chunk.iter_days() {
                if self.cache.contains(date).await {
                    skipped_cached += 1;
                    continue;
                }

                self.throttle.acquire().await;

                match self.fetcher.fetch(date).await {
                    Ok(mut payload) => {
                        // Some providers echo the date, some don't; the cache
                        // membership test depends on it being present.
                        payload
                            .date
                            .get_or_insert_with(|| date.format("%Y-%m-%d").to_string());
                        self.cache.append(payload).await?;
                        fetched += 1;
                        chunk_fetched += 1;
                    }
                    Err(e) => {
                        warn!(%date, error = %e, "fetch failed, skipping date");
                        failed_dates.push((date, e.to_string()));
                    }
                }
            }

            // Checkpoint: a kill between chunks loses at most one chunk of
            // fetches, and the next run skips everything flushed here.
            self.cache.flush().await?;
            info!(
                chunk = idx + 1,
                total = chunks.len(),
                fetched = chunk_fetched,
                "chunk complete, cache flushed"
            );
        }

        let cached_total = self.cache.len().await;
        info!(
            run_id = %run_id,
            fetched,
            skipped_cached,
            failed = failed_dates.len(),
            cached_total,
            "rate fetch complete"
        );

        Ok(BackfillReport {
            run_id,
            range,
            chunks: chunks.len(),
            fetched,
            skipped_cached,
            failed_dates,
            cached_total,
        })
    }
}

#[async_trait]
impl BackfillService for BackfillServiceImpl {
    async fn backfill_range(&self, range: DateRange) -> Result<BackfillReport, BackfillError> {
        self.run(range, self.chunk_count).await
    }

    async fn fetch_recent(&self, days: u32) -> Result<BackfillReport, BackfillError> {
        let days = days.max(1);
        let end = Utc::now().date_naive();
        let start = end
            .checked_sub_days(Days::new(u64::from(days) - 1))
            .expect("date underflow");
        let range = DateRange::new(start, end).expect("recent window must be valid");
        self.run(range, 1).await
    }
}

#[derive(Debug)]
pub struct BackfillReport {
    pub run_id: String,
    pub range: DateRange,
    pub chunks: usize,
    pub fetched: usize,
    pub skipped_cached: usize,
    pub failed_dates: Vec<(NaiveDate, String)>,
    pub cached_total: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum BackfillError {
    #[error("Cache error: {0}")]
    CacheError(#[from] CacheError),
}
