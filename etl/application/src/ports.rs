use async_trait::async_trait;
use chrono::NaiveDate;
use etl_domain::RatePayload;
use shaku::Interface;

/// Capability for reaching the external rate-provider API. Called once per
/// pending date; any failure is local to that date.
#[async_trait]
pub trait RateFetcher: Interface {
    async fn fetch(&self, date: NaiveDate) -> Result<RatePayload, FetchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("Invalid rate payload: {0}")]
    InvalidPayload(String),
}
