use rateio_client::{db::StorageError, domain::Period};

/// Why a baseline period could not be established.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodState {
    #[error("the first apartment has no reading for {0}")]
    NoAnchor(Period),
    #[error("no readings were recorded before {0}")]
    NoPriorPeriod(Period),
}

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("the apartment roster is empty")]
    EmptyRoster,
    #[error("invalid period state: {0}")]
    InvalidPeriodState(#[from] PeriodState),
    #[error("total consumption is zero, allocation shares are undefined")]
    DivisionUndefined,
    #[error("baseline and current readings are misaligned: {0}")]
    MisalignedPeriods(String),
    #[error("reading value {0} is negative")]
    InvalidReading(i64),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("background task error: {0}")]
    Task(String),
}
