pub mod backfill_service;
pub mod config;
pub mod currency_service;
pub mod load_service;
pub mod merge;
pub mod payload_cache;
pub mod ports;
pub mod store;
pub mod throttle;

pub use backfill_service::{
    BackfillError, BackfillReport, BackfillService, BackfillServiceImpl,
};
pub use config::{ConfigError, EtlConfig, StoreBackend};
pub use currency_service::{
    CurrencySeed, CurrencySeedReport, CurrencyService, CurrencyServiceImpl,
};
pub use load_service::{LoadError, LoadReport, LoadService, LoadServiceImpl};
pub use merge::{IncrementalMerger, MergeError, MergeOutcome};
pub use payload_cache::{CacheError, PayloadCache};
pub use ports::{FetchError, RateFetcher};
pub use store::{RateStore, StoreError};
pub use throttle::RequestThrottle;
