use anyhow::{bail, Result};
use rateio_service::{
    bootstrap,
    config::AppConfig,
    engine::ApartmentRegistry,
    observability,
    pipeline::Pipeline,
    sinks::RegistrySink,
    sources::{RosterEntry, RosterFileSource},
    transform,
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: import_roster <roster_file_path>");
    }
    let file_path = &args[1];

    let cfg = AppConfig::load()?;
    let store = bootstrap::open_store(&cfg).await?;

    let pipeline: Pipeline<_, RosterEntry, _> = Pipeline {
        source: RosterFileSource::new(file_path),
        transforms: vec![Arc::new(transform::RosterValidation)],
        sink: RegistrySink::new(ApartmentRegistry::new(store)),
    };

    let summary = pipeline.run().await?;
    println!(
        "imported {} apartments ({} already registered, {} rejected)",
        summary.written, summary.skipped, summary.rejected
    );

    Ok(())
}
