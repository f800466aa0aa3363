use etl_application::{EtlConfig, LoadService};

mod di {
    include!("../di.rs");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = EtlConfig::from_env()?;
    let services = di::create_services(&config)?;

    let rows = services.load.rebuild_calendar().await?;
    println!("Rebuilt dim_time with {} row(s) sourced from the fact table.", rows);

    Ok(())
}
