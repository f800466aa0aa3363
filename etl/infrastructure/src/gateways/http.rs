use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use etl_application::ports::{FetchError, RateFetcher};
use etl_domain::RatePayload;
use shaku::Component;
use tracing::debug;

/// Fetches one date of rates from the provider's historical endpoint:
/// `GET {base_url}/{YYYY-MM-DD}?access_key=..&base=..&symbols=..`.
/// The request timeout is carried by the injected client.
#[derive(Component)]
#[shaku(interface = RateFetcher)]
pub struct HttpRateFetcher {
    #[shaku(default = reqwest::Client::new())]
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    base_currency: String,
    symbols: String,
}

impl HttpRateFetcher {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        base_currency: String,
        symbols: String,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            base_currency,
            symbols,
        }
    }

    fn endpoint(&self, date: NaiveDate) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            date.format("%Y-%m-%d")
        )
    }
}

#[async_trait]
impl RateFetcher for HttpRateFetcher {
    async fn fetch(&self, date: NaiveDate) -> Result<RatePayload, FetchError> {
        let endpoint = self.endpoint(date);
        debug!(%date, "requesting rates");

        let response = self
            .client
            .get(&endpoint)
            .query(&[
                ("access_key", self.api_key.as_str()),
                ("base", self.base_currency.as_str()),
                ("symbols", self.symbols.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let mut payload: RatePayload = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidPayload(e.to_string()))?;

        // Traceability stamp, plus the date in case the provider doesn't
        // echo it.
        payload.fetched_at = Some(Utc::now().to_rfc3339());
        payload
            .date
            .get_or_insert_with(|| date.format("%Y-%m-%d").to_string());

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(base_url: &str) -> HttpRateFetcher {
        HttpRateFetcher::new(
            reqwest::Client::new(),
            base_url.to_string(),
            "test-key".to_string(),
            "AUD".to_string(),
            "EUR,USD".to_string(),
        )
    }

    #[test]
    fn test_endpoint_join_handles_trailing_slash() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            fetcher("https://api.example.com/v1/").endpoint(date),
            "https://api.example.com/v1/2024-01-01"
        );
        assert_eq!(
            fetcher("https://api.example.com/v1").endpoint(date),
            "https://api.example.com/v1/2024-01-01"
        );
    }
}
