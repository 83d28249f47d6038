use anyhow::Result;
use rateio_service::{bootstrap, config::AppConfig, observability, tasks};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let engine = bootstrap::build_engine(&cfg).await?;

    let progress = engine.capture_progress().await?;
    if !progress.is_complete() {
        tracing::warn!(
            missing = progress.missing(),
            period = %progress.period,
            "capture round incomplete, apartments without both readings are left out"
        );
    }

    let handle = tasks::spawn_report(engine, cfg.report.output_dir.clone());
    let path = tasks::join_report(handle).await?;
    println!("{}", path.display());

    Ok(())
}
