use anyhow::Result;
use rateio_service::{bootstrap, config::AppConfig, observability};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let engine = bootstrap::build_engine(&cfg).await?;

    let progress = engine.capture_progress().await?;
    println!(
        "{} {}: {} of {} apartments read",
        engine.condominium_name(),
        progress.period,
        progress.recorded,
        progress.total
    );

    for apt in engine.registry().list_all().await? {
        if engine.readings().get_current(apt.id).await?.is_none() {
            println!("  missing: {} {}", apt.block, apt.formatted_number());
        }
    }

    if !progress.is_complete() {
        std::process::exit(1);
    }
    Ok(())
}
