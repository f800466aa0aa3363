use std::path::PathBuf;

use clap::Parser;
use etl_application::{CurrencyService, EtlConfig};
use etl_infrastructure::{default_currency_seeds, load_currency_seeds};

mod di {
    include!("../di.rs");
}

#[derive(Parser)]
#[command(name = "seed-currencies")]
#[command(about = "Seed the currency dimension from a CSV or the default list", long_about = None)]
struct Cli {
    /// CSV with `currency_code,currency_name` rows (header skipped).
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = EtlConfig::from_env()?;

    let seeds = match &cli.csv {
        Some(path) => load_currency_seeds(path)?,
        None => default_currency_seeds(),
    };

    let services = di::create_services(&config)?;
    let report = services.currencies.seed(seeds).await?;

    println!(
        "dim_currency seeded: {} inserted, {} skipped (existing or malformed).",
        report.inserted, report.skipped
    );
    Ok(())
}
