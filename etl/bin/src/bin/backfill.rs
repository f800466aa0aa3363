use chrono::NaiveDate;
use clap::Parser;
use etl_application::{BackfillService, BackfillServiceImpl, EtlConfig};
use etl_domain::DateRange;

mod di {
    include!("../di.rs");
}

#[derive(Parser)]
#[command(name = "backfill")]
#[command(about = "Chunked historical backfill of FX rates", long_about = None)]
struct Cli {
    /// Defaults to BACKFILL_YEARS of history ending yesterday.
    #[arg(short, long)]
    start_date: Option<String>,

    #[arg(short, long)]
    end_date: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = EtlConfig::from_env()?;

    let default_range = BackfillServiceImpl::default_backfill_range(config.backfill_years);
    let start_date = match cli.start_date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")?,
        None => default_range.start(),
    };
    let end_date = match cli.end_date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")?,
        None => default_range.end(),
    };
    let range = DateRange::new(start_date, end_date)?;

    println!(
        "Starting backfill from {} to {} in {} chunk(s)",
        start_date, end_date, config.backfill_chunks
    );

    let services = di::create_services(&config)?;
    let report = services.backfill.backfill_range(range).await?;

    println!("\nBackfill completed:");
    println!("  Run id: {}", report.run_id);
    println!("  Days fetched: {}", report.fetched);
    println!("  Days already cached: {}", report.skipped_cached);
    println!("  Cache total: {}", report.cached_total);

    if !report.failed_dates.is_empty() {
        println!("\n  Failed days:");
        for (date, error) in &report.failed_dates {
            println!("    {} - {}", date, error);
        }
    }

    println!("\nNext steps: run seed-currencies and etl to load the warehouse.");
    Ok(())
}
