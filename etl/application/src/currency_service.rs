use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use shaku::{Component, Interface};
use tracing::{info, warn};

use crate::store::{RateStore, StoreError};
use etl_domain::currency::normalize_code;
use etl_domain::CurrencyRow;

/// One candidate entry for the currency dimension, before key assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencySeed {
    pub code: String,
    pub name: String,
}

impl CurrencySeed {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

#[async_trait]
pub trait CurrencyService: Interface {
    /// Inserts the entries not yet present. Codes already in the store keep
    /// their surrogate key; new codes are assigned `max_key + 1 ..` in input
    /// order, so keys stay stable across reseeding.
    async fn seed(&self, entries: Vec<CurrencySeed>) -> Result<CurrencySeedReport, StoreError>;
}

#[derive(Component)]
#[shaku(interface = CurrencyService)]
pub struct CurrencyServiceImpl {
    #[shaku(inject)]
    store: Arc<dyn RateStore>,
}

impl CurrencyServiceImpl {
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CurrencyService for CurrencyServiceImpl {
    async fn seed(&self, entries: Vec<CurrencySeed>) -> Result<CurrencySeedReport, StoreError> {
        self.store.ensure_schema().await?;

        let existing = self.store.currencies().await?;
        let mut next_key = existing
            .iter()
            .map(|row| row.currency_key)
            .max()
            .unwrap_or(0)
            + 1;
        let mut seen: HashSet<String> = existing
            .into_iter()
            .map(|row| row.currency_code)
            .collect();

        let mut new_rows = Vec::new();
        let mut skipped = 0usize;
        for entry in entries {
            let Some(code) = normalize_code(&entry.code) else {
                warn!(code = %entry.code, "dropping malformed currency code");
                skipped += 1;
                continue;
            };
            if !seen.insert(code.clone()) {
                skipped += 1;
                continue;
            }
            new_rows.push(CurrencyRow::new(next_key, code, entry.name.trim()));
            next_key += 1;
        }

        let inserted = new_rows.len();
        if !new_rows.is_empty() {
            self.store.insert_currencies(new_rows).await?;
        }

        info!(inserted, skipped, "currency dimension seeded");
        Ok(CurrencySeedReport { inserted, skipped })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct CurrencySeedReport {
    pub inserted: usize,
    pub skipped: usize,
}
