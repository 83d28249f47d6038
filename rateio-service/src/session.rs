use std::sync::Arc;

use rateio_client::domain::Apartment;

use crate::engine::{CaptureProgress, EngineError, RateioEngine, UpsertOutcome};

/// Where a navigation request left the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Moved(Apartment),
    /// Already at the first/last apartment; the session did not move.
    Boundary,
}

/// Data-entry walk over the roster for the current period.
///
/// Recording a value and moving on are a single step, matching how readings
/// are taken door to door.
pub struct CaptureSession {
    engine: Arc<RateioEngine>,
    current: Apartment,
}

impl CaptureSession {
    /// Start at the first registered apartment.
    pub async fn start(engine: Arc<RateioEngine>) -> Result<Self, EngineError> {
        let current = engine.registry().get_first().await?;
        Ok(Self { engine, current })
    }

    pub fn current(&self) -> &Apartment {
        &self.current
    }

    /// Reading already captured for the current apartment this period, or 0.
    pub async fn current_value(&self) -> Result<i64, EngineError> {
        Ok(self
            .engine
            .readings()
            .get_current(self.current.id)
            .await?
            .map_or(0, |r| r.value))
    }

    /// Move to `(block, number)`. Returns `false`, staying put, when it is not
    /// registered.
    pub async fn jump_to(&mut self, block: &str, number: i32) -> Result<bool, EngineError> {
        match self.engine.registry().get_by_block_and_number(block, number).await? {
            Some(apt) => {
                self.current = apt;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn record(&self, value: i64) -> Result<UpsertOutcome, EngineError> {
        self.engine
            .readings()
            .record_current(self.current.id, value)
            .await
    }

    pub async fn record_and_next(&mut self, value: i64) -> Result<Step, EngineError> {
        self.record(value).await?;
        let registry = self.engine.registry();
        if registry.is_last(&self.current.block, self.current.number).await? {
            return Ok(Step::Boundary);
        }
        let next = registry
            .get_next(&self.current.block, self.current.number)
            .await?;
        self.move_to(next)
    }

    pub async fn record_and_previous(&mut self, value: i64) -> Result<Step, EngineError> {
        self.record(value).await?;
        let registry = self.engine.registry();
        if registry.is_first(&self.current.block, self.current.number).await? {
            return Ok(Step::Boundary);
        }
        let previous = registry
            .get_previous(&self.current.block, self.current.number)
            .await?;
        self.move_to(previous)
    }

    fn move_to(&mut self, target: Option<Apartment>) -> Result<Step, EngineError> {
        match target {
            Some(apt) => {
                self.current = apt.clone();
                Ok(Step::Moved(apt))
            }
            None => Ok(Step::Boundary),
        }
    }

    /// Whether every apartment has a reading for the current period.
    pub async fn finish_check(&self) -> Result<CaptureProgress, EngineError> {
        self.engine.capture_progress().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FixedClock;
    use rateio_client::{db::MemoryStore, domain::Period};

    async fn session(roster: &[(&str, i32)]) -> CaptureSession {
        let engine = Arc::new(RateioEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedClock(Period::new(2024, 5).unwrap())),
            "Aurora",
        ));
        for (block, number) in roster {
            engine.registry().register(block, *number).await.unwrap();
        }
        CaptureSession::start(engine).await.unwrap()
    }

    #[tokio::test]
    async fn walks_the_roster_recording_values() {
        let mut s = session(&[("A", 1), ("A", 2), ("B", 1)]).await;
        assert!(s.current().is("A", 1));
        assert_eq!(s.current_value().await.unwrap(), 0);

        assert!(matches!(s.record_and_next(10).await.unwrap(), Step::Moved(_)));
        assert!(matches!(s.record_and_next(20).await.unwrap(), Step::Moved(_)));
        assert!(s.current().is("B", 1));
        assert!(!s.finish_check().await.unwrap().is_complete());

        assert_eq!(s.record_and_next(30).await.unwrap(), Step::Boundary);
        assert!(s.current().is("B", 1));
        assert!(s.finish_check().await.unwrap().is_complete());

        s.record_and_previous(31).await.unwrap();
        assert!(s.current().is("A", 2));
        assert_eq!(s.current_value().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn previous_stops_at_first_apartment() {
        let mut s = session(&[("A", 1), ("A", 2)]).await;

        assert_eq!(s.record_and_previous(5).await.unwrap(), Step::Boundary);
        assert!(s.current().is("A", 1));
        assert_eq!(s.current_value().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn jumping_to_unknown_apartment_keeps_position() {
        let mut s = session(&[("A", 1), ("B", 7)]).await;

        assert!(!s.jump_to("C", 1).await.unwrap());
        assert!(s.current().is("A", 1));
        assert!(s.jump_to("B", 7).await.unwrap());
        assert!(s.current().is("B", 7));
    }

    #[tokio::test]
    async fn empty_roster_cannot_start() {
        let engine = Arc::new(RateioEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedClock(Period::new(2024, 5).unwrap())),
            "Aurora",
        ));
        assert!(matches!(
            CaptureSession::start(engine).await,
            Err(EngineError::EmptyRoster)
        ));
    }
}
