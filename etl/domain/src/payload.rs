use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw fetch response, exactly as cached on disk. Every field the
/// provider may omit is optional; unknown fields round-trip through `extra`.
/// Payloads are append-only: once cached they are never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rates: Option<Value>,
    /// Provider timestamp, epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// RFC 3339 instant stamped by the fetcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RatePayload {
    pub fn new(base: impl Into<String>, date: impl Into<String>, rates: Value) -> Self {
        Self {
            base: Some(base.into()),
            date: Some(date.into()),
            rates: Some(rates),
            timestamp: None,
            fetched_at: None,
            extra: Map::new(),
        }
    }
}
