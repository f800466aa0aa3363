use std::sync::Arc;

use etl_domain::{CalendarIndex, DateKeyRange, FactRow};
use tracing::{debug, info};

use crate::store::{RateStore, StoreError};

/// Decides which candidate rows are genuinely new relative to the store and
/// appends exactly those. Re-running a merge with the same input inserts
/// nothing the second time; a row already resident is never re-inserted or
/// overwritten.
pub struct IncrementalMerger {
    store: Arc<dyn RateStore>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub inserted: usize,
    pub duplicates: usize,
}

impl IncrementalMerger {
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        Self { store }
    }

    pub async fn merge(
        &self,
        candidates: Vec<FactRow>,
        calendar: &CalendarIndex,
    ) -> Result<MergeOutcome, MergeError> {
        let Some(key_range) = DateKeyRange::spanning(&candidates) else {
            return Ok(MergeOutcome::default());
        };

        // Only the window the candidates span; the fact table may be large.
        let existing = self.store.existing_keys(key_range).await?;
        debug!(
            start = key_range.start,
            end = key_range.end,
            existing = existing.len(),
            "loaded existing keys for candidate window"
        );

        let mut seen = existing;
        let mut new_rows: Vec<FactRow> = Vec::new();
        let mut duplicates = 0usize;
        for row in candidates {
            if seen.insert(row.key()) {
                new_rows.push(row);
            } else {
                duplicates += 1;
            }
        }

        if new_rows.is_empty() {
            info!(duplicates, "merge found no new rows");
            return Ok(MergeOutcome {
                inserted: 0,
                duplicates,
            });
        }

        // A fact without its calendar row would be an orphan the store may
        // not reject on its own; fail before anything is written.
        let mut missing: Vec<i64> = new_rows
            .iter()
            .map(FactRow::date_key)
            .filter(|key| !calendar.contains(*key))
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            missing.dedup();
            return Err(MergeError::MissingCalendarDimension(missing));
        }

        let max_id = self.store.max_fact_id().await?;
        for (offset, row) in new_rows.iter_mut().enumerate() {
            row.assign_id(max_id + 1 + offset as i64);
        }

        let inserted = new_rows.len();
        self.store.append_facts(new_rows).await?;
        info!(inserted, duplicates, "merge complete");

        Ok(MergeOutcome {
            inserted,
            duplicates,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("No calendar row for date_key(s) {0:?}")]
    MissingCalendarDimension(Vec<i64>),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
