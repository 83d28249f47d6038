pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::domain::{Apartment, ApartmentReading, Period, Reading};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("apartment {block}/{number} is already registered")]
    DuplicateApartment { block: String, number: i32 },
    #[error("apartment {apartment_id} already has a reading for {period}")]
    DuplicateReading { apartment_id: i64, period: Period },
    #[error("apartment {0} does not exist")]
    UnknownApartment(i64),
    #[error("reading {0} does not exist")]
    MissingReading(i64),
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Persistence port the engine runs against.
///
/// Every listing is ordered by apartment id ascending. Implementations must keep
/// the listing of the joined view and the reading listing in the same order so
/// that two periods can be zipped index for index.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn insert_apartment(&self, block: &str, number: i32) -> Result<Apartment, StorageError>;
    async fn apartment_by_block_and_number(
        &self,
        block: &str,
        number: i32,
    ) -> Result<Option<Apartment>, StorageError>;
    async fn apartment_by_id(&self, id: i64) -> Result<Option<Apartment>, StorageError>;
    async fn first_apartment(&self) -> Result<Option<Apartment>, StorageError>;
    async fn last_apartment(&self) -> Result<Option<Apartment>, StorageError>;
    async fn list_apartments(&self) -> Result<Vec<Apartment>, StorageError>;
    async fn count_apartments(&self) -> Result<i64, StorageError>;
    async fn distinct_blocks(&self) -> Result<Vec<String>, StorageError>;
    async fn clear_apartments(&self) -> Result<(), StorageError>;

    async fn reading_for(
        &self,
        apartment_id: i64,
        period: Period,
    ) -> Result<Option<Reading>, StorageError>;
    async fn reading_by_id(&self, id: i64) -> Result<Option<Reading>, StorageError>;
    async fn insert_reading(
        &self,
        apartment_id: i64,
        period: Period,
        value: i64,
    ) -> Result<Reading, StorageError>;
    async fn update_reading_value(&self, id: i64, value: i64) -> Result<(), StorageError>;
    async fn count_readings(&self, period: Period) -> Result<i64, StorageError>;
    async fn sum_readings(&self, period: Period) -> Result<i64, StorageError>;
    async fn readings_for_period(&self, period: Period) -> Result<Vec<Reading>, StorageError>;
    async fn apartment_readings_for_period(
        &self,
        period: Period,
    ) -> Result<Vec<ApartmentReading>, StorageError>;
    /// Greatest period strictly before `period` holding at least one reading.
    async fn latest_period_before(&self, period: Period) -> Result<Option<Period>, StorageError>;
    async fn clear_readings_for_period(&self, period: Period) -> Result<u64, StorageError>;
    async fn clear_readings(&self) -> Result<u64, StorageError>;
}
