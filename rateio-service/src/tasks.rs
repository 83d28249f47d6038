//! Running engine work off the caller's task.
//!
//! The caller reports "working" before [`spawn_report`] and inspects the
//! result after [`join_report`]; the engine itself is unaware of either.

use std::{path::PathBuf, sync::Arc};

use tokio::task::JoinHandle;

use crate::engine::{EngineError, RateioEngine};

pub type ReportHandle = JoinHandle<Result<PathBuf, EngineError>>;

pub fn spawn_report(engine: Arc<RateioEngine>, output_dir: PathBuf) -> ReportHandle {
    tokio::spawn(async move { engine.write_report(&output_dir).await })
}

/// Wait for a spawned report, folding a panicked or cancelled task into
/// [`EngineError::Task`].
pub async fn join_report(handle: ReportHandle) -> Result<PathBuf, EngineError> {
    handle
        .await
        .map_err(|e| EngineError::Task(e.to_string()))?
}
