//! Reading & allocation engine.
//!
//! The engine owns no global state: storage, clock and condominium name are
//! handed to [`RateioEngine::new`]. Every operation awaits its storage calls in
//! sequence.

pub mod allocation;
pub mod clock;
pub mod error;
pub mod period_resolver;
pub mod readings;
pub mod registry;
pub mod report;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use rateio_client::db::Storage;

pub use allocation::{align_periods, allocate, AllocatedRow, Allocation};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{EngineError, PeriodState};
pub use period_resolver::{PeriodResolver, ReportPeriods};
pub use readings::{CaptureProgress, ReadingStore, UpsertOutcome};
pub use registry::ApartmentRegistry;

/// Everything a report run needs, computed but not yet written.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedReport {
    pub periods: ReportPeriods,
    pub allocation: Allocation,
}

pub struct RateioEngine {
    registry: ApartmentRegistry,
    readings: ReadingStore,
    resolver: PeriodResolver,
    storage: Arc<dyn Storage>,
    condominium_name: String,
}

impl RateioEngine {
    pub fn new(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        condominium_name: impl Into<String>,
    ) -> Self {
        Self {
            registry: ApartmentRegistry::new(storage.clone()),
            readings: ReadingStore::new(storage.clone(), clock.clone()),
            resolver: PeriodResolver::new(storage.clone(), clock),
            storage,
            condominium_name: condominium_name.into(),
        }
    }

    pub fn registry(&self) -> &ApartmentRegistry {
        &self.registry
    }

    pub fn readings(&self) -> &ReadingStore {
        &self.readings
    }

    pub fn resolver(&self) -> &PeriodResolver {
        &self.resolver
    }

    pub fn condominium_name(&self) -> &str {
        &self.condominium_name
    }

    /// Progress of the capture round for the current period.
    pub async fn capture_progress(&self) -> Result<CaptureProgress, EngineError> {
        self.readings
            .capture_progress(self.readings.current_period())
            .await
    }

    /// Resolve the baseline, load both periods and allocate.
    pub async fn prepare_report(&self) -> Result<PreparedReport, EngineError> {
        let periods = self.resolver.resolve_baseline().await?;

        let baseline = self
            .storage
            .apartment_readings_for_period(periods.baseline)
            .await?;
        let current = self
            .storage
            .apartment_readings_for_period(periods.current)
            .await?;
        let (baseline, current) = align_periods(baseline, current);

        let allocation = allocate(&baseline, &current)?;
        Ok(PreparedReport {
            periods,
            allocation,
        })
    }

    /// Generate the report for the current period into `output_dir`.
    pub async fn write_report(&self, output_dir: &Path) -> Result<PathBuf, EngineError> {
        let prepared = match self.prepare_report().await {
            Ok(p) => p,
            Err(e) => {
                metrics::counter!("report_failures_total").increment(1);
                tracing::error!(error = %e, "allocation report aborted");
                return Err(e);
            }
        };

        let path = report::report_path(
            output_dir,
            &self.condominium_name,
            prepared.periods.current,
        );
        report::write_report(
            &path,
            &self.condominium_name,
            prepared.periods.baseline,
            prepared.periods.current,
            &prepared.allocation,
        )?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rateio_client::{db::MemoryStore, domain::Period};

    fn period(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    async fn engine_with(baseline: &[i64], current: &[i64]) -> RateioEngine {
        let storage = Arc::new(MemoryStore::new());
        let engine = RateioEngine::new(
            storage,
            Arc::new(FixedClock(period(2024, 5))),
            "Aurora",
        );

        for (i, (b, c)) in baseline.iter().zip(current).enumerate() {
            let apt = engine.registry().register("A", i as i32 + 1).await.unwrap();
            engine.readings().upsert(apt.id, period(2024, 4), *b).await.unwrap();
            engine.readings().record_current(apt.id, *c).await.unwrap();
        }
        engine
    }

    #[tokio::test]
    async fn three_apartment_scenario() {
        let engine = engine_with(&[10, 20, 30], &[15, 25, 40]).await;

        let prepared = engine.prepare_report().await.unwrap();

        assert_eq!(prepared.periods.baseline, period(2024, 4));
        assert_eq!(prepared.periods.current, period(2024, 5));
        let allocation = prepared.allocation;
        assert_eq!(allocation.total_consumption, 20);
        let consumption: Vec<i64> = allocation.rows.iter().map(|r| r.consumption).collect();
        assert_eq!(consumption, vec![5, 5, 10]);
        assert_eq!(consumption.iter().sum::<i64>(), allocation.total_consumption);
        let shares: Vec<String> = allocation.rows.iter().map(|r| r.share_display()).collect();
        assert_eq!(shares, vec!["25.00", "25.00", "50.00"]);
    }

    #[tokio::test]
    async fn writes_report_under_output_dir() {
        let engine = engine_with(&[10, 20, 30], &[15, 25, 45]).await;
        let dir = tempfile::tempdir().unwrap();

        let path = engine.write_report(dir.path()).await.unwrap();

        assert_eq!(path, dir.path().join("Aurora_5_2024.csv"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Periodo:,04/2024 a 05/2024\n"));
        assert!(text.contains("Volume total (m³):,25\n"));
        assert!(text.contains("A,003,30,45,15,60.00\n"));
    }

    #[tokio::test]
    async fn zero_consumption_aborts_without_a_file() {
        let engine = engine_with(&[10, 20], &[10, 20]).await;
        let dir = tempfile::tempdir().unwrap();

        let err = engine.write_report(dir.path()).await.unwrap_err();

        assert!(matches!(err, EngineError::DivisionUndefined));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn apartments_missing_a_period_are_left_out() {
        let engine = engine_with(&[10, 20], &[15, 30]).await;
        let late = engine.registry().register("B", 1).await.unwrap();
        engine.readings().record_current(late.id, 99).await.unwrap();

        let prepared = engine.prepare_report().await.unwrap();

        assert_eq!(prepared.allocation.rows.len(), 2);
        assert_eq!(prepared.allocation.total_consumption, 15);
    }

    #[tokio::test]
    async fn upsert_and_report_against_sqlite() {
        use rateio_client::db::SqliteStore;

        let store = SqliteStore::connect("sqlite::memory:", 1).await.unwrap();
        store.ensure_schema().await.unwrap();
        let engine = RateioEngine::new(
            Arc::new(store),
            Arc::new(FixedClock(period(2024, 5))),
            "Aurora",
        );

        for (number, (b, c)) in [(10, 15), (20, 25), (30, 40)].into_iter().enumerate() {
            let apt = engine.registry().register("A", number as i32 + 1).await.unwrap();
            engine.readings().upsert(apt.id, period(2024, 4), b).await.unwrap();
            engine.readings().record_current(apt.id, c - 1).await.unwrap();
            let outcome = engine.readings().record_current(apt.id, c).await.unwrap();
            assert!(matches!(outcome, UpsertOutcome::Updated(_)));
        }
        assert_eq!(engine.readings().count_for_period(period(2024, 5)).await.unwrap(), 3);

        let prepared = engine.prepare_report().await.unwrap();

        assert_eq!(prepared.periods.baseline, period(2024, 4));
        assert_eq!(prepared.allocation.total_consumption, 20);
        let shares: Vec<String> = prepared
            .allocation
            .rows
            .iter()
            .map(|r| r.share_display())
            .collect();
        assert_eq!(shares, vec!["25.00", "25.00", "50.00"]);
    }

    #[tokio::test]
    async fn capture_progress_tracks_current_period() {
        let engine = engine_with(&[10], &[15]).await;
        let second = engine.registry().register("A", 2).await.unwrap();

        let progress = engine.capture_progress().await.unwrap();
        assert_eq!((progress.recorded, progress.total), (1, 2));

        engine.readings().record_current(second.id, 3).await.unwrap();
        assert!(engine.capture_progress().await.unwrap().is_complete());
    }
}
