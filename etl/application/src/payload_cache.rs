use async_trait::async_trait;
use chrono::NaiveDate;
use etl_domain::RatePayload;
use shaku::Interface;

/// Append-only cache of raw payloads, keyed by date. The membership test is
/// what makes an interrupted backfill resumable: every date already recorded
/// is skipped on the next run.
#[async_trait]
pub trait PayloadCache: Interface {
    async fn contains(&self, date: NaiveDate) -> bool;

    /// Adds to both the ordered payload list and the date set.
    async fn append(&self, payload: RatePayload) -> Result<(), CacheError>;

    /// Persists the full ordered list atomically: a crash mid-flush must not
    /// leave a truncated file behind.
    async fn flush(&self) -> Result<(), CacheError>;

    async fn payloads(&self) -> Vec<RatePayload>;

    async fn len(&self) -> usize;
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}
