use crate::pipeline::{Envelope, PipelineError, Transform};
use crate::sources::RosterEntry;

/// Pure validation of a roster line.
///
/// Rules:
/// - block must not be empty.
/// - apartment number must be non-negative.
pub fn validate_roster_entry(env: Envelope<RosterEntry>) -> Result<Envelope<RosterEntry>, PipelineError> {
    let e = &env.payload;

    if e.block.trim().is_empty() {
        return Err(PipelineError::Transform(format!(
            "line {}: block must not be empty",
            env.position
        )));
    }

    if e.number < 0 {
        return Err(PipelineError::Transform(format!(
            "line {}: apartment number must be non-negative",
            env.position
        )));
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct RosterValidation;

#[async_trait::async_trait]
impl Transform<RosterEntry, RosterEntry> for RosterValidation {
    async fn apply(
        &self,
        input: Envelope<RosterEntry>,
    ) -> Result<Envelope<RosterEntry>, PipelineError> {
        match validate_roster_entry(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_roster_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(block: &str, number: i32) -> Envelope<RosterEntry> {
        Envelope {
            payload: RosterEntry {
                block: block.to_string(),
                number,
            },
            position: 1,
        }
    }

    #[test]
    fn roster_validation_accepts_valid_entry() {
        assert!(validate_roster_entry(env("A", 101)).is_ok());
        assert!(validate_roster_entry(env("Torre 2", 0)).is_ok());
    }

    #[test]
    fn roster_validation_rejects_empty_block() {
        let res = validate_roster_entry(env("", 101));
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }

    #[test]
    fn roster_validation_rejects_negative_number() {
        let res = validate_roster_entry(env("A", -3));
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }
}
