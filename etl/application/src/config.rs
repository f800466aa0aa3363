use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.exchangeratesapi.io/v1/";
pub const DEFAULT_BASE_CURRENCY: &str = "AUD";
pub const DEFAULT_SYMBOLS: &str = "EUR,USD,GBP,SGD";
pub const DEFAULT_CACHE_PATH: &str = "data/historical_exchange_rates.json";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/exchange_rates.db";

/// Which `RateStore` adapter to wire up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Warehouse,
}

/// Explicit configuration passed into construction. Nothing in the library
/// crates reads the environment ambiently; this is assembled once at the
/// binary edge.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub base_currency: String,
    pub symbols: Vec<String>,
    pub backfill_years: u32,
    pub backfill_chunks: usize,
    pub request_timeout: Duration,
    pub request_delay: Duration,
    pub fetch_days: u32,
    pub cache_path: PathBuf,
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub warehouse_url: Option<String>,
}

impl EtlConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let store_backend = parse_backend(
            optional("STORE_BACKEND").as_deref().unwrap_or("sqlite"),
        )?;
        let warehouse_url = optional("WAREHOUSE_URL");
        if store_backend == StoreBackend::Warehouse && warehouse_url.is_none() {
            return Err(ConfigError::MissingVar("WAREHOUSE_URL"));
        }

        Ok(Self {
            api_key: require("EXCHANGE_API_KEY")?,
            api_base_url: optional("EXCHANGE_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            base_currency: optional("BASE_CURRENCY")
                .unwrap_or_else(|| DEFAULT_BASE_CURRENCY.to_string()),
            symbols: parse_symbols(
                &optional("SYMBOLS").unwrap_or_else(|| DEFAULT_SYMBOLS.to_string()),
            )?,
            backfill_years: parse_var("BACKFILL_YEARS", 10)?,
            backfill_chunks: parse_var::<usize>("BACKFILL_CHUNKS", 5)?.max(1),
            request_timeout: Duration::from_secs(parse_var("REQUEST_TIMEOUT", 20)?),
            request_delay: Duration::from_millis(parse_var("REQUEST_DELAY_MS", 200)?),
            fetch_days: parse_var("FETCH_DAYS", 1)?,
            cache_path: PathBuf::from(
                optional("CACHE_PATH").unwrap_or_else(|| DEFAULT_CACHE_PATH.to_string()),
            ),
            store_backend,
            database_url: optional("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            warehouse_url,
        })
    }

    /// Comma-joined symbol list, as the provider expects it.
    pub fn symbols_param(&self) -> String {
        self.symbols.join(",")
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::MissingVar(name))
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name,
            value: raw,
        }),
    }
}

fn parse_symbols(raw: &str) -> Result<Vec<String>, ConfigError> {
    let symbols: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        return Err(ConfigError::InvalidValue {
            name: "SYMBOLS",
            value: raw.to_string(),
        });
    }
    Ok(symbols)
}

fn parse_backend(raw: &str) -> Result<StoreBackend, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "sqlite" => Ok(StoreBackend::Sqlite),
        "warehouse" | "postgres" => Ok(StoreBackend::Warehouse),
        _ => Err(ConfigError::InvalidValue {
            name: "STORE_BACKEND",
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing {0} in environment or .env")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
