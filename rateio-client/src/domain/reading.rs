use super::{Apartment, Period};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    pub id: i64,
    pub apartment_id: i64,
    pub period: Period,
    pub value: i64,
}

/// Apartment joined with its reading for one period.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApartmentReading {
    pub apartment: Apartment,
    pub period: Period,
    pub value: i64,
}
