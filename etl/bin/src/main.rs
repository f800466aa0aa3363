mod di;

use crate::di::create_services;
use etl_application::{BackfillService, EtlConfig, LoadService};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting FX rates ETL (daily mode)");

    let config = EtlConfig::from_env()?;
    let services = create_services(&config)?;

    let fetch = services.backfill.fetch_recent(config.fetch_days).await?;
    println!(
        "Fetched {} new day(s), skipped {} cached, {} failed (cache total {}).",
        fetch.fetched,
        fetch.skipped_cached,
        fetch.failed_dates.len(),
        fetch.cached_total
    );
    for (date, error) in &fetch.failed_dates {
        println!("  {} - {}", date, error);
    }

    let load = services.load.load().await?;
    println!(
        "Loaded {} new fact row(s) from {} candidate(s); {} duplicate(s) dropped, {} calendar row(s).",
        load.merge.inserted, load.candidate_rows, load.merge.duplicates, load.calendar_rows
    );
    if load.malformed_payloads > 0 {
        println!(
            "  {} malformed cache entr(ies) were skipped.",
            load.malformed_payloads
        );
    }

    info!("Daily ETL complete");
    Ok(())
}
