use futures::StreamExt;
use rateio_client::db::StorageError;

use crate::engine::ApartmentRegistry;
use crate::pipeline::{Envelope, PipelineError, Sink, SinkSummary};
use crate::sources::RosterEntry;

/// Registers roster entries as apartments, in stream order.
///
/// Apartments already registered are skipped; rejected upstream records are
/// logged and counted. An unreadable source or any other storage failure aborts
/// the import.
pub struct RegistrySink {
    registry: ApartmentRegistry,
}

impl RegistrySink {
    pub fn new(registry: ApartmentRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait::async_trait]
impl Sink<RosterEntry> for RegistrySink {
    async fn run<S>(&self, mut input: S) -> Result<SinkSummary, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<RosterEntry>, PipelineError>>
            + Send
            + Unpin
            + 'static,
    {
        let mut summary = SinkSummary::default();

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e @ PipelineError::SourceUnavailable(_)) => {
                    tracing::error!(error = %e, "roster import aborted");
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(error = %e, "roster record rejected");
                    metrics::counter!("roster_rejected_total").increment(1);
                    summary.rejected += 1;
                    continue;
                }
            };

            let RosterEntry { block, number } = &env.payload;
            match self.registry.register(block, *number).await {
                Ok(_) => {
                    metrics::counter!("roster_apartments_imported_total").increment(1);
                    summary.written += 1;
                }
                Err(StorageError::DuplicateApartment { .. }) => {
                    tracing::warn!(block = %block, number = *number, line = env.position, "apartment already registered, skipping");
                    summary.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, line = env.position, "roster import failed");
                    return Err(PipelineError::Sink(e.to_string()));
                }
            }
        }

        tracing::info!(
            imported = summary.written,
            skipped = summary.skipped,
            rejected = summary.rejected,
            "roster import finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rateio_client::db::MemoryStore;

    fn entry(block: &str, number: i32, position: u64) -> Result<Envelope<RosterEntry>, PipelineError> {
        Ok(Envelope {
            payload: RosterEntry {
                block: block.to_string(),
                number,
            },
            position,
        })
    }

    #[tokio::test]
    async fn registers_entries_in_order_and_skips_duplicates() {
        let registry = ApartmentRegistry::new(Arc::new(MemoryStore::new()));
        let sink = RegistrySink::new(registry.clone());
        let input = futures::stream::iter(vec![
            entry("A", 101, 1),
            entry("A", 102, 2),
            Err(PipelineError::Source("line 3: expected 2 fields, found 1".into())),
            entry("A", 101, 4),
            entry("B", 1, 5),
        ]);

        let summary = sink.run(input).await.unwrap();

        assert_eq!(
            summary,
            SinkSummary {
                written: 3,
                skipped: 1,
                rejected: 1,
            }
        );
        let all: Vec<(String, i32)> = registry
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|a| (a.block, a.number))
            .collect();
        assert_eq!(
            all,
            vec![("A".into(), 101), ("A".into(), 102), ("B".into(), 1)]
        );
    }

    #[tokio::test]
    async fn roster_file_pipeline_end_to_end() {
        use std::io::Write;

        use crate::{pipeline::Pipeline, sources::RosterFileSource, transform::RosterValidation};

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "A,101\nA,102\nA,-1\nA,abc\nB,1\nA,101\n").unwrap();

        let registry = ApartmentRegistry::new(Arc::new(MemoryStore::new()));
        let pipeline: Pipeline<_, RosterEntry, _> = Pipeline {
            source: RosterFileSource::new(file.path()),
            transforms: vec![Arc::new(RosterValidation)],
            sink: RegistrySink::new(registry.clone()),
        };

        let summary = pipeline.run().await.unwrap();

        assert_eq!((summary.written, summary.skipped, summary.rejected), (3, 1, 2));
        assert_eq!(registry.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn missing_roster_file_fails_the_import() {
        use crate::{pipeline::Pipeline, sources::RosterFileSource, transform::RosterValidation};

        let dir = tempfile::tempdir().unwrap();
        let registry = ApartmentRegistry::new(Arc::new(MemoryStore::new()));
        let pipeline: Pipeline<_, RosterEntry, _> = Pipeline {
            source: RosterFileSource::new(dir.path().join("missing.txt")),
            transforms: vec![Arc::new(RosterValidation)],
            sink: RegistrySink::new(registry.clone()),
        };

        let res = pipeline.run().await;

        assert!(matches!(res, Err(PipelineError::SourceUnavailable(_))));
        assert_eq!(registry.count().await.unwrap(), 0);
    }
}
