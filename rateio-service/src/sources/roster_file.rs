use std::{fs::File, path::PathBuf};

use csv::StringRecord;
use futures::Stream;

use crate::pipeline::{Envelope, PipelineError, Source};

/// One line of the roster file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub block: String,
    pub number: i32,
}

/// Roster file source: one apartment per line, `block,number`, no header.
///
/// Malformed lines are yielded as errors and reading continues with the next
/// line; only a file that cannot be opened ends the stream early.
pub struct RosterFileSource {
    path: PathBuf,
}

impl RosterFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn record_to_entry(record: &StringRecord, line: u64) -> Result<RosterEntry, PipelineError> {
    if record.len() != 2 {
        return Err(PipelineError::Source(format!(
            "line {line}: expected 'block,number', got {} field(s)",
            record.len()
        )));
    }

    let block = record[0].to_string();
    let number_str = &record[1];
    let number: i32 = number_str
        .parse()
        .map_err(|e| PipelineError::Source(format!("line {line}: invalid number '{number_str}': {e}")))?;

    Ok(RosterEntry { block, number })
}

#[async_trait::async_trait]
impl Source<RosterEntry> for RosterFileSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<RosterEntry>, PipelineError>> + Send>>
    {
        // Blocking reader inside the stream; roster files are a few hundred lines.
        let path = self.path.clone();
        let s = async_stream::stream! {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::SourceUnavailable(format!(
                        "failed to open roster file {}: {e}",
                        path.display()
                    )));
                    return;
                }
            };
            let mut rdr = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .trim(csv::Trim::All)
                .from_reader(file);

            for result in rdr.records() {
                let record = match result {
                    Ok(r) => r,
                    Err(e) => {
                        yield Err(PipelineError::Source(format!("failed to read roster record: {e}")));
                        continue;
                    }
                };
                let line = record.position().map_or(0, |p| p.line());

                match record_to_entry(&record, line) {
                    Ok(entry) => yield Ok(Envelope { payload: entry, position: line }),
                    Err(e) => {
                        metrics::counter!("roster_parse_errors_total").increment(1);
                        yield Err(e);
                    }
                }
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Write;

    async fn collect(contents: &str) -> Vec<Result<Envelope<RosterEntry>, PipelineError>> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let source = RosterFileSource::new(file.path());
        source.stream().await.collect().await
    }

    #[tokio::test]
    async fn reads_block_and_number_per_line() {
        let items = collect("A,101\nA, 102\n\nB ,7\n").await;

        let entries: Vec<RosterEntry> = items.into_iter().map(|r| r.unwrap().payload).collect();
        assert_eq!(
            entries,
            vec![
                RosterEntry { block: "A".into(), number: 101 },
                RosterEntry { block: "A".into(), number: 102 },
                RosterEntry { block: "B".into(), number: 7 },
            ]
        );
    }

    #[tokio::test]
    async fn malformed_lines_do_not_stop_the_stream() {
        let items = collect("A,1\nA,one\nA\nA,2\n").await;

        assert_eq!(items.len(), 4);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(PipelineError::Source(_))));
        assert!(matches!(items[2], Err(PipelineError::Source(_))));
        assert_eq!(items[3].as_ref().unwrap().payload.number, 2);
        assert_eq!(items[3].as_ref().unwrap().position, 4);
    }

    #[tokio::test]
    async fn missing_file_yields_single_error() {
        let source = RosterFileSource::new("/nonexistent/roster.txt");
        let items: Vec<_> = source.stream().await.collect().await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(PipelineError::SourceUnavailable(_))));
    }
}
