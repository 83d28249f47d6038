use rateio_client::domain::Period;
use time::OffsetDateTime;

/// Source of the "current" billing period.
pub trait Clock: Send + Sync {
    fn current_period(&self) -> Period;
}

/// Wall-clock period in the host's local offset.
///
/// `time` refuses to read the local offset once the process is multi-threaded
/// on some platforms; UTC is used in that case.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn current_period(&self) -> Period {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Period::from_date(now.date())
    }
}

/// Always reports the same period.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Period);

impl Clock for FixedClock {
    fn current_period(&self) -> Period {
        self.0
    }
}
