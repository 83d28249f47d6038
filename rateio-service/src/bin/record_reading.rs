use anyhow::{bail, Result};
use rateio_service::{bootstrap, config::AppConfig, engine::UpsertOutcome, observability};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        bail!("usage: record_reading <block> <number> <value>");
    }
    let block = &args[1];
    let number: i32 = args[2].parse()?;
    let value: i64 = args[3].parse()?;

    let cfg = AppConfig::load()?;
    let engine = bootstrap::build_engine(&cfg).await?;

    let Some(apt) = engine.registry().get_by_block_and_number(block, number).await? else {
        bail!("apartment {block} {number} is not registered");
    };

    let period = engine.readings().current_period();
    let outcome = engine.readings().record_current(apt.id, value).await?;
    let verb = match outcome {
        UpsertOutcome::Inserted(_) => "recorded",
        UpsertOutcome::Updated(_) => "updated",
        UpsertOutcome::Unchanged(_) => "unchanged",
    };
    println!("{block} {} {period}: {value} ({verb})", apt.formatted_number());

    Ok(())
}
