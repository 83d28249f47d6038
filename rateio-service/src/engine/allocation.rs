use std::cmp::Ordering;

use rateio_client::domain::{Apartment, ApartmentReading};

use super::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub struct AllocatedRow {
    pub apartment: Apartment,
    pub previous_value: i64,
    pub current_value: i64,
    pub consumption: i64,
    pub share_percent: f64,
}

impl AllocatedRow {
    /// Share with two decimals and a dot separator, independent of locale.
    pub fn share_display(&self) -> String {
        format!("{:.2}", self.share_percent)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub rows: Vec<AllocatedRow>,
    pub total_baseline: i64,
    pub total_current: i64,
    pub total_consumption: i64,
}

/// Split the consumption between two aligned periods across apartments.
///
/// `baseline` and `current` must list the same apartments in the same order.
/// Fails with [`EngineError::DivisionUndefined`] when the net consumption is
/// zero.
pub fn allocate(
    baseline: &[ApartmentReading],
    current: &[ApartmentReading],
) -> Result<Allocation, EngineError> {
    if baseline.len() != current.len() {
        return Err(EngineError::MisalignedPeriods(format!(
            "{} baseline rows against {} current rows",
            baseline.len(),
            current.len()
        )));
    }
    if let Some((b, c)) = baseline
        .iter()
        .zip(current)
        .find(|(b, c)| b.apartment.id != c.apartment.id)
    {
        return Err(EngineError::MisalignedPeriods(format!(
            "apartment {} paired with apartment {}",
            b.apartment.id, c.apartment.id
        )));
    }

    let total_baseline: i64 = baseline.iter().map(|r| r.value).sum();
    let total_current: i64 = current.iter().map(|r| r.value).sum();
    let total_consumption = (total_current - total_baseline).abs();

    if total_consumption == 0 {
        return Err(EngineError::DivisionUndefined);
    }

    let rows = baseline
        .iter()
        .zip(current)
        .map(|(b, c)| {
            let consumption = (c.value - b.value).abs();
            AllocatedRow {
                apartment: c.apartment.clone(),
                previous_value: b.value,
                current_value: c.value,
                consumption,
                share_percent: consumption as f64 / total_consumption as f64 * 100.0,
            }
        })
        .collect();

    Ok(Allocation {
        rows,
        total_baseline,
        total_current,
        total_consumption,
    })
}

/// Keep only the apartments that have a reading in both periods.
///
/// Both inputs must be ordered by apartment id; the output keeps that order.
pub fn align_periods(
    baseline: Vec<ApartmentReading>,
    current: Vec<ApartmentReading>,
) -> (Vec<ApartmentReading>, Vec<ApartmentReading>) {
    let mut aligned_baseline = Vec::with_capacity(baseline.len().min(current.len()));
    let mut aligned_current = Vec::with_capacity(aligned_baseline.capacity());

    let mut b_iter = baseline.into_iter().peekable();
    let mut c_iter = current.into_iter().peekable();

    loop {
        // Exhausted inputs sort last so the other side drains as unmatched.
        let order = match (b_iter.peek(), c_iter.peek()) {
            (Some(b), Some(c)) => b.apartment.id.cmp(&c.apartment.id),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };

        match order {
            Ordering::Less => {
                if let Some(b) = b_iter.next() {
                    tracing::warn!(
                        apartment_id = b.apartment.id,
                        "no current reading, apartment left out of allocation"
                    );
                }
            }
            Ordering::Greater => {
                if let Some(c) = c_iter.next() {
                    tracing::warn!(
                        apartment_id = c.apartment.id,
                        "no baseline reading, apartment left out of allocation"
                    );
                }
            }
            Ordering::Equal => {
                if let (Some(b), Some(c)) = (b_iter.next(), c_iter.next()) {
                    aligned_baseline.push(b);
                    aligned_current.push(c);
                }
            }
        }
    }

    (aligned_baseline, aligned_current)
}
