pub mod cache;
pub mod gateways;
pub mod seeds;
pub mod stores;
pub mod throttling;

pub use cache::JsonFilePayloadCache;
pub use gateways::HttpRateFetcher;
pub use seeds::{default_currency_seeds, load_currency_seeds, SeedFileError};
pub use stores::{PostgresRateStore, SqliteRateStore};
pub use throttling::FixedIntervalThrottle;
