use std::sync::Arc;

use rateio_client::{
    db::Storage,
    domain::{Period, Reading},
};
use tokio::sync::Mutex;

use super::{Clock, EngineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(i64),
    Updated(i64),
    Unchanged(i64),
}

impl UpsertOutcome {
    pub fn reading_id(&self) -> i64 {
        match *self {
            Self::Inserted(id) | Self::Updated(id) | Self::Unchanged(id) => id,
        }
    }
}

/// How many apartments already have a reading in a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureProgress {
    pub period: Period,
    pub recorded: i64,
    pub total: i64,
}

impl CaptureProgress {
    pub fn is_complete(&self) -> bool {
        self.recorded == self.total
    }

    pub fn missing(&self) -> i64 {
        (self.total - self.recorded).max(0)
    }
}

/// One reading per apartment and period.
pub struct ReadingStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    // Serializes the lookup-then-write sequence of `upsert`.
    write_lock: Mutex<()>,
}

impl ReadingStore {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn current_period(&self) -> Period {
        self.clock.current_period()
    }

    pub async fn get_current(&self, apartment_id: i64) -> Result<Option<Reading>, EngineError> {
        self.get_for_period(apartment_id, self.current_period()).await
    }

    pub async fn get_for_period(
        &self,
        apartment_id: i64,
        period: Period,
    ) -> Result<Option<Reading>, EngineError> {
        Ok(self.storage.reading_for(apartment_id, period).await?)
    }

    /// Insert the reading, overwrite a different stored value in place, or do
    /// nothing when the stored value already matches.
    pub async fn upsert(
        &self,
        apartment_id: i64,
        period: Period,
        value: i64,
    ) -> Result<UpsertOutcome, EngineError> {
        if value < 0 {
            return Err(EngineError::InvalidReading(value));
        }

        let _guard = self.write_lock.lock().await;

        let outcome = match self.storage.reading_for(apartment_id, period).await? {
            None => {
                let reading = self.storage.insert_reading(apartment_id, period, value).await?;
                metrics::counter!("readings_inserted_total").increment(1);
                UpsertOutcome::Inserted(reading.id)
            }
            Some(existing) if existing.value != value => {
                self.storage.update_reading_value(existing.id, value).await?;
                metrics::counter!("readings_updated_total").increment(1);
                UpsertOutcome::Updated(existing.id)
            }
            Some(existing) => {
                metrics::counter!("readings_unchanged_total").increment(1);
                UpsertOutcome::Unchanged(existing.id)
            }
        };

        tracing::debug!(apartment_id, %period, value, ?outcome, "reading upserted");
        Ok(outcome)
    }

    pub async fn record_current(
        &self,
        apartment_id: i64,
        value: i64,
    ) -> Result<UpsertOutcome, EngineError> {
        self.upsert(apartment_id, self.current_period(), value).await
    }

    pub async fn count_for_period(&self, period: Period) -> Result<i64, EngineError> {
        Ok(self.storage.count_readings(period).await?)
    }

    pub async fn list_for_period(&self, period: Period) -> Result<Vec<Reading>, EngineError> {
        Ok(self.storage.readings_for_period(period).await?)
    }

    pub async fn sum_for_period(&self, period: Period) -> Result<i64, EngineError> {
        Ok(self.storage.sum_readings(period).await?)
    }

    pub async fn capture_progress(&self, period: Period) -> Result<CaptureProgress, EngineError> {
        let recorded = self.storage.count_readings(period).await?;
        let total = self.storage.count_apartments().await?;
        Ok(CaptureProgress {
            period,
            recorded,
            total,
        })
    }

    pub async fn clear_period(&self, period: Period) -> Result<u64, EngineError> {
        let _guard = self.write_lock.lock().await;
        let removed = self.storage.clear_readings_for_period(period).await?;
        tracing::warn!(%period, removed, "readings cleared for period");
        Ok(removed)
    }

    pub async fn clear_all(&self) -> Result<u64, EngineError> {
        let _guard = self.write_lock.lock().await;
        let removed = self.storage.clear_readings().await?;
        tracing::warn!(removed, "all readings cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FixedClock;
    use rateio_client::db::MemoryStore;

    fn period(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    async fn fixture() -> (ReadingStore, Arc<MemoryStore>, i64) {
        let storage = Arc::new(MemoryStore::new());
        let apt = storage.insert_apartment("A", 1).await.unwrap();
        let store = ReadingStore::new(storage.clone(), Arc::new(FixedClock(period(2024, 5))));
        (store, storage, apt.id)
    }

    #[tokio::test]
    async fn repeated_upsert_with_same_value_is_a_no_op() {
        let (store, _, apt) = fixture().await;
        let may = period(2024, 5);

        let first = store.upsert(apt, may, 42).await.unwrap();
        let second = store.upsert(apt, may, 42).await.unwrap();

        assert!(matches!(first, UpsertOutcome::Inserted(_)));
        assert_eq!(second, UpsertOutcome::Unchanged(first.reading_id()));
        assert_eq!(store.count_for_period(may).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_overwrites_in_place() {
        let (store, _, apt) = fixture().await;
        let may = period(2024, 5);

        let first = store.upsert(apt, may, 42).await.unwrap();
        let second = store.upsert(apt, may, 50).await.unwrap();

        assert_eq!(second, UpsertOutcome::Updated(first.reading_id()));
        let listed = store.list_for_period(may).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, first.reading_id());
        assert_eq!(listed[0].value, 50);
    }

    #[tokio::test]
    async fn negative_values_are_rejected() {
        let (store, _, apt) = fixture().await;

        let err = store.upsert(apt, period(2024, 5), -1).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidReading(-1)));
        assert_eq!(store.count_for_period(period(2024, 5)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn current_reading_matches_year_and_month() {
        let (store, _, apt) = fixture().await;
        store.upsert(apt, period(2023, 5), 7).await.unwrap();

        assert_eq!(store.get_current(apt).await.unwrap(), None);

        store.record_current(apt, 9).await.unwrap();
        let current = store.get_current(apt).await.unwrap().unwrap();
        assert_eq!(current.value, 9);
        assert_eq!(current.period, period(2024, 5));
    }

    #[tokio::test]
    async fn progress_compares_readings_with_roster_size() {
        let (store, storage, apt) = fixture().await;
        let other = storage.insert_apartment("A", 2).await.unwrap();
        let may = period(2024, 5);

        store.upsert(apt, may, 10).await.unwrap();
        let progress = store.capture_progress(may).await.unwrap();
        assert!(!progress.is_complete());
        assert_eq!(progress.missing(), 1);

        store.upsert(other.id, may, 12).await.unwrap();
        let progress = store.capture_progress(may).await.unwrap();
        assert!(progress.is_complete());
        assert_eq!(store.sum_for_period(may).await.unwrap(), 22);
    }

    #[tokio::test]
    async fn clearing_a_period_keeps_other_periods() {
        let (store, _, apt) = fixture().await;
        store.upsert(apt, period(2024, 4), 1).await.unwrap();
        store.upsert(apt, period(2024, 5), 2).await.unwrap();

        assert_eq!(store.clear_period(period(2024, 4)).await.unwrap(), 1);
        assert_eq!(store.count_for_period(period(2024, 5)).await.unwrap(), 1);
        assert_eq!(store.clear_all().await.unwrap(), 1);
    }
}
