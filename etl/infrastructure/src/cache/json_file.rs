use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use etl_application::payload_cache::{CacheError, PayloadCache};
use etl_domain::RatePayload;
use shaku::Component;
use tokio::sync::Mutex;
use tracing::{info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Default)]
pub struct CacheState {
    entries: Vec<RatePayload>,
    dates: HashSet<NaiveDate>,
}

/// Payload cache backed by one JSON array on disk. A backfill must never
/// abort merely because the file is absent or truncated, so loading is
/// tolerant; flushing rewrites the whole file through a temp-and-rename so a
/// crash cannot leave a corrupt cache behind.
#[derive(Component)]
#[shaku(interface = PayloadCache)]
pub struct JsonFilePayloadCache {
    path: PathBuf,
    state: Arc<Mutex<CacheState>>,
}

impl JsonFilePayloadCache {
    pub fn new(path: PathBuf) -> Self {
        let state = Self::load_state(&path);
        Self {
            path,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn load_state(path: &Path) -> CacheState {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no cache file yet, starting empty");
                return CacheState::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable cache file, starting empty");
                return CacheState::default();
            }
        };

        match serde_json::from_slice::<Vec<RatePayload>>(&raw) {
            Ok(entries) => {
                let dates = entries
                    .iter()
                    .filter_map(|payload| parse_payload_date(payload))
                    .collect();
                info!(path = %path.display(), records = entries.len(), "loaded payload cache");
                CacheState { entries, dates }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cache file, starting empty");
                CacheState::default()
            }
        }
    }
}

fn parse_payload_date(payload: &RatePayload) -> Option<NaiveDate> {
    payload
        .date
        .as_deref()
        .and_then(|raw| NaiveDate::parse_from_str(raw, DATE_FORMAT).ok())
}

#[async_trait]
impl PayloadCache for JsonFilePayloadCache {
    async fn contains(&self, date: NaiveDate) -> bool {
        self.state.lock().await.dates.contains(&date)
    }

    async fn append(&self, payload: RatePayload) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;
        if let Some(date) = parse_payload_date(&payload) {
            state.dates.insert(date);
        }
        state.entries.push(payload);
        Ok(())
    }

    async fn flush(&self) -> Result<(), CacheError> {
        let state = self.state.lock().await;
        let json = serde_json::to_vec_pretty(&state.entries)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    async fn payloads(&self) -> Vec<RatePayload> {
        self.state.lock().await.entries.clone()
    }

    async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fx-cache-{}-{}.json", std::process::id(), name))
    }

    fn payload(value: serde_json::Value) -> RatePayload {
        serde_json::from_value(value).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let cache = JsonFilePayloadCache::new(temp_path("missing"));
        assert_eq!(cache.len().await, 0);
        assert!(!cache.contains(date(2024, 1, 1)).await);
    }

    #[tokio::test]
    async fn truncated_file_loads_empty() {
        let path = temp_path("truncated");
        fs::write(&path, b"[{\"base\": \"AUD\", \"da").unwrap();

        let cache = JsonFilePayloadCache::new(path.clone());
        assert_eq!(cache.len().await, 0);

        fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn append_flush_reload_round_trip() {
        let path = temp_path("round-trip");
        fs::remove_file(&path).ok();

        let cache = JsonFilePayloadCache::new(path.clone());
        cache
            .append(payload(json!({
                "base": "AUD",
                "date": "2024-01-01",
                "rates": {"USD": 0.65},
                "success": true
            })))
            .await
            .unwrap();
        cache
            .append(payload(json!({
                "base": "AUD",
                "date": "2024-01-02",
                "rates": {"USD": 0.66}
            })))
            .await
            .unwrap();
        cache.flush().await.unwrap();

        let reloaded = JsonFilePayloadCache::new(path.clone());
        assert_eq!(reloaded.len().await, 2);
        assert!(reloaded.contains(date(2024, 1, 1)).await);
        assert!(reloaded.contains(date(2024, 1, 2)).await);
        assert!(!reloaded.contains(date(2024, 1, 3)).await);

        // Order and unknown fields survive the round trip.
        let entries = reloaded.payloads().await;
        assert_eq!(entries[0].date.as_deref(), Some("2024-01-01"));
        assert_eq!(entries[0].extra.get("success"), Some(&json!(true)));

        fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn entries_without_dates_are_kept_but_unindexed() {
        let path = temp_path("undated");
        fs::remove_file(&path).ok();

        let cache = JsonFilePayloadCache::new(path.clone());
        cache
            .append(payload(json!({"rates": {"USD": 0.65}})))
            .await
            .unwrap();

        assert_eq!(cache.len().await, 1);
        assert!(!cache.contains(date(2024, 1, 1)).await);

        fs::remove_file(path).ok();
    }
}
