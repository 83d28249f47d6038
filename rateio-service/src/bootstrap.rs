//! Wiring shared by the binaries: storage, clock and engine from an
//! [`AppConfig`].

use std::sync::Arc;

use rateio_client::db::SqliteStore;

use crate::{
    config::AppConfig,
    engine::{RateioEngine, SystemClock},
};

pub async fn open_store(cfg: &AppConfig) -> anyhow::Result<Arc<SqliteStore>> {
    let store = SqliteStore::connect(&cfg.storage.url, cfg.storage.max_connections).await?;
    store.ensure_schema().await?;
    tracing::info!(url = %cfg.storage.url, "storage ready");
    Ok(Arc::new(store))
}

pub async fn build_engine(cfg: &AppConfig) -> anyhow::Result<Arc<RateioEngine>> {
    let store = open_store(cfg).await?;
    let name = cfg.condominium_name()?;
    Ok(Arc::new(RateioEngine::new(store, Arc::new(SystemClock), name)))
}
