use std::sync::Arc;

use rateio_client::{db::Storage, domain::Period};

use super::{Clock, EngineError, PeriodState};

/// Baseline and current periods of one report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriods {
    pub baseline: Period,
    pub current: Period,
}

pub struct PeriodResolver {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl PeriodResolver {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Latest period before `anchor` that has at least one reading, from any
    /// apartment.
    pub async fn find_last_complete_prior_period(
        &self,
        anchor: Period,
    ) -> Result<Option<Period>, EngineError> {
        Ok(self.storage.latest_period_before(anchor).await?)
    }

    /// Anchor on the first apartment's reading for the current period and look
    /// back from there.
    pub async fn resolve_baseline(&self) -> Result<ReportPeriods, EngineError> {
        let current = self.clock.current_period();
        let first = self
            .storage
            .first_apartment()
            .await?
            .ok_or(EngineError::EmptyRoster)?;

        let anchor = self
            .storage
            .reading_for(first.id, current)
            .await?
            .ok_or(PeriodState::NoAnchor(current))?
            .period;

        let baseline = self
            .find_last_complete_prior_period(anchor)
            .await?
            .ok_or(PeriodState::NoPriorPeriod(anchor))?;

        tracing::info!(%baseline, current = %anchor, "baseline period resolved");
        Ok(ReportPeriods {
            baseline,
            current: anchor,
        })
    }
}
