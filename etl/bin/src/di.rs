use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use etl_application::backfill_service::BackfillServiceImplParameters;
use etl_application::{
    BackfillService, BackfillServiceImpl, CurrencyService, CurrencyServiceImpl, EtlConfig,
    LoadService, LoadServiceImpl, StoreBackend,
};
use etl_infrastructure::cache::json_file::JsonFilePayloadCacheParameters;
use etl_infrastructure::gateways::http::HttpRateFetcherParameters;
use etl_infrastructure::stores::postgres::PostgresRateStoreParameters;
use etl_infrastructure::stores::sqlite::SqliteRateStoreParameters;
use etl_infrastructure::throttling::fixed_interval::FixedIntervalThrottleParameters;
use etl_infrastructure::{
    FixedIntervalThrottle, HttpRateFetcher, JsonFilePayloadCache, PostgresRateStore,
    SqliteRateStore,
};
use shaku::{module, HasComponent};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::Mutex;

module! {
    pub SqliteEtlModule {
        components = [
            HttpRateFetcher,
            JsonFilePayloadCache,
            FixedIntervalThrottle,
            SqliteRateStore,
            BackfillServiceImpl,
            LoadServiceImpl,
            CurrencyServiceImpl
        ],
        providers = []
    }
}

module! {
    pub WarehouseEtlModule {
        components = [
            HttpRateFetcher,
            JsonFilePayloadCache,
            FixedIntervalThrottle,
            PostgresRateStore,
            BackfillServiceImpl,
            LoadServiceImpl,
            CurrencyServiceImpl
        ],
        providers = []
    }
}

/// Resolved service handles, independent of which store backend was wired.
pub struct EtlServices {
    pub backfill: Arc<dyn BackfillService>,
    pub load: Arc<dyn LoadService>,
    pub currencies: Arc<dyn CurrencyService>,
}

pub fn create_services(config: &EtlConfig) -> anyhow::Result<EtlServices> {
    if let Some(parent) = config.cache_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("creating cache directory")?;
        }
    }

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("building HTTP client")?;

    match config.store_backend {
        StoreBackend::Sqlite => {
            let options = SqliteConnectOptions::from_str(&config.database_url)
                .context("parsing DATABASE_URL")?
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_lazy_with(options);

            let module = SqliteEtlModule::builder()
                .with_component_parameters::<HttpRateFetcher>(fetcher_parameters(config, client))
                .with_component_parameters::<JsonFilePayloadCache>(cache_parameters(config))
                .with_component_parameters::<FixedIntervalThrottle>(throttle_parameters(config))
                .with_component_parameters::<SqliteRateStore>(SqliteRateStoreParameters { pool })
                .with_component_parameters::<BackfillServiceImpl>(BackfillServiceImplParameters {
                    chunk_count: config.backfill_chunks,
                })
                .build();

            Ok(EtlServices {
                backfill: module.resolve(),
                load: module.resolve(),
                currencies: module.resolve(),
            })
        }
        StoreBackend::Warehouse => {
            let url = config
                .warehouse_url
                .as_deref()
                .context("WAREHOUSE_URL must be set for the warehouse backend")?;
            let pool = PgPoolOptions::new()
                .connect_lazy(url)
                .context("parsing WAREHOUSE_URL")?;

            let module = WarehouseEtlModule::builder()
                .with_component_parameters::<HttpRateFetcher>(fetcher_parameters(config, client))
                .with_component_parameters::<JsonFilePayloadCache>(cache_parameters(config))
                .with_component_parameters::<FixedIntervalThrottle>(throttle_parameters(config))
                .with_component_parameters::<PostgresRateStore>(PostgresRateStoreParameters {
                    pool,
                })
                .with_component_parameters::<BackfillServiceImpl>(BackfillServiceImplParameters {
                    chunk_count: config.backfill_chunks,
                })
                .build();

            Ok(EtlServices {
                backfill: module.resolve(),
                load: module.resolve(),
                currencies: module.resolve(),
            })
        }
    }
}

fn fetcher_parameters(config: &EtlConfig, client: reqwest::Client) -> HttpRateFetcherParameters {
    HttpRateFetcherParameters {
        client,
        base_url: config.api_base_url.clone(),
        api_key: config.api_key.clone(),
        base_currency: config.base_currency.clone(),
        symbols: config.symbols_param(),
    }
}

fn cache_parameters(config: &EtlConfig) -> JsonFilePayloadCacheParameters {
    JsonFilePayloadCacheParameters {
        path: config.cache_path.clone(),
        state: Arc::new(Mutex::new(JsonFilePayloadCache::load_state(
            &config.cache_path,
        ))),
    }
}

fn throttle_parameters(config: &EtlConfig) -> FixedIntervalThrottleParameters {
    FixedIntervalThrottleParameters {
        interval: config.request_delay,
        last_call: Arc::new(Mutex::new(None)),
    }
}
