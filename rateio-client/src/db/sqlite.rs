use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::{Storage, StorageError};
use crate::domain::{Apartment, ApartmentReading, Period, Reading};

const SCHEMA: &str = include_str!("../../sql/schema.sql");

#[derive(Debug, sqlx::FromRow)]
struct ReadingRow {
    id: i64,
    apartment_id: i64,
    year: i32,
    month: i64,
    value: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ApartmentReadingRow {
    id: i64,
    block: String,
    number: i32,
    year: i32,
    month: i64,
    value: i64,
}

fn period_from_row(year: i32, month: i64) -> Result<Period, StorageError> {
    let month = u32::try_from(month)
        .map_err(|_| StorageError::CorruptRow(format!("negative month {month}")))?;
    Period::new(year, month).map_err(|e| StorageError::CorruptRow(e.to_string()))
}

impl TryFrom<ReadingRow> for Reading {
    type Error = StorageError;

    fn try_from(row: ReadingRow) -> Result<Self, Self::Error> {
        Ok(Reading {
            id: row.id,
            apartment_id: row.apartment_id,
            period: period_from_row(row.year, row.month)?,
            value: row.value,
        })
    }
}

impl TryFrom<ApartmentReadingRow> for ApartmentReading {
    type Error = StorageError;

    fn try_from(row: ApartmentReadingRow) -> Result<Self, Self::Error> {
        Ok(ApartmentReading {
            apartment: Apartment {
                id: row.id,
                block: row.block,
                number: row.number,
            },
            period: period_from_row(row.year, row.month)?,
            value: row.value,
        })
    }
}

/// SQLite-backed storage.
///
/// In-memory URLs (`sqlite::memory:`) must be opened with a single connection,
/// since every connection gets its own private database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes that do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Storage for SqliteStore {
    async fn insert_apartment(&self, block: &str, number: i32) -> Result<Apartment, StorageError> {
        let res = sqlx::query_as::<_, Apartment>(
            r#"
            INSERT INTO apartment (block, number)
            VALUES ($1, $2)
            RETURNING id, block, number
            "#,
        )
        .bind(block)
        .bind(number)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(apt) => Ok(apt),
            Err(e)
                if e
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation()) =>
            {
                Err(StorageError::DuplicateApartment {
                    block: block.to_string(),
                    number,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn apartment_by_block_and_number(
        &self,
        block: &str,
        number: i32,
    ) -> Result<Option<Apartment>, StorageError> {
        let apt = sqlx::query_as::<_, Apartment>(
            "SELECT id, block, number FROM apartment WHERE block = $1 AND number = $2",
        )
        .bind(block)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(apt)
    }

    async fn apartment_by_id(&self, id: i64) -> Result<Option<Apartment>, StorageError> {
        let apt = sqlx::query_as::<_, Apartment>(
            "SELECT id, block, number FROM apartment WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(apt)
    }

    async fn first_apartment(&self) -> Result<Option<Apartment>, StorageError> {
        let apt = sqlx::query_as::<_, Apartment>(
            "SELECT id, block, number FROM apartment ORDER BY id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(apt)
    }

    async fn last_apartment(&self) -> Result<Option<Apartment>, StorageError> {
        let apt = sqlx::query_as::<_, Apartment>(
            "SELECT id, block, number FROM apartment ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(apt)
    }

    async fn list_apartments(&self) -> Result<Vec<Apartment>, StorageError> {
        let rows = sqlx::query_as::<_, Apartment>(
            "SELECT id, block, number FROM apartment ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_apartments(&self) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM apartment")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn distinct_blocks(&self) -> Result<Vec<String>, StorageError> {
        let blocks = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT block FROM apartment ORDER BY block",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(blocks)
    }

    async fn clear_apartments(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM reading").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM apartment").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn reading_for(
        &self,
        apartment_id: i64,
        period: Period,
    ) -> Result<Option<Reading>, StorageError> {
        let row = sqlx::query_as::<_, ReadingRow>(
            r#"
            SELECT id, apartment_id, year, month, value
            FROM reading
            WHERE apartment_id = $1
              AND year = $2
              AND month = $3
            "#,
        )
        .bind(apartment_id)
        .bind(period.year())
        .bind(i64::from(period.month()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Reading::try_from).transpose()
    }

    async fn reading_by_id(&self, id: i64) -> Result<Option<Reading>, StorageError> {
        let row = sqlx::query_as::<_, ReadingRow>(
            "SELECT id, apartment_id, year, month, value FROM reading WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Reading::try_from).transpose()
    }

    async fn insert_reading(
        &self,
        apartment_id: i64,
        period: Period,
        value: i64,
    ) -> Result<Reading, StorageError> {
        let res = sqlx::query_as::<_, ReadingRow>(
            r#"
            INSERT INTO reading (apartment_id, year, month, value)
            VALUES ($1, $2, $3, $4)
            RETURNING id, apartment_id, year, month, value
            "#,
        )
        .bind(apartment_id)
        .bind(period.year())
        .bind(i64::from(period.month()))
        .bind(value)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => Reading::try_from(row),
            Err(e) => match e.as_database_error() {
                Some(db) if db.is_unique_violation() => Err(StorageError::DuplicateReading {
                    apartment_id,
                    period,
                }),
                Some(db) if db.is_foreign_key_violation() => {
                    Err(StorageError::UnknownApartment(apartment_id))
                }
                _ => Err(e.into()),
            },
        }
    }

    async fn update_reading_value(&self, id: i64, value: i64) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE reading SET value = $1 WHERE id = $2")
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::MissingReading(id));
        }
        Ok(())
    }

    async fn count_readings(&self, period: Period) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(1) FROM reading WHERE year = $1 AND month = $2",
        )
        .bind(period.year())
        .bind(i64::from(period.month()))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn sum_readings(&self, period: Period) -> Result<i64, StorageError> {
        let sum = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(value), 0) FROM reading WHERE year = $1 AND month = $2",
        )
        .bind(period.year())
        .bind(i64::from(period.month()))
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }

    async fn readings_for_period(&self, period: Period) -> Result<Vec<Reading>, StorageError> {
        let rows = sqlx::query_as::<_, ReadingRow>(
            r#"
            SELECT id, apartment_id, year, month, value
            FROM reading
            WHERE year = $1
              AND month = $2
            ORDER BY apartment_id ASC
            "#,
        )
        .bind(period.year())
        .bind(i64::from(period.month()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Reading::try_from).collect()
    }

    async fn apartment_readings_for_period(
        &self,
        period: Period,
    ) -> Result<Vec<ApartmentReading>, StorageError> {
        let rows = sqlx::query_as::<_, ApartmentReadingRow>(
            r#"
            SELECT
                a.id,
                a.block,
                a.number,
                r.year,
                r.month,
                r.value
            FROM apartment a
            JOIN reading r ON r.apartment_id = a.id
            WHERE r.year = $1
              AND r.month = $2
            ORDER BY a.id ASC
            "#,
        )
        .bind(period.year())
        .bind(i64::from(period.month()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ApartmentReading::try_from).collect()
    }

    async fn latest_period_before(&self, period: Period) -> Result<Option<Period>, StorageError> {
        let row = sqlx::query_as::<_, (i32, i64)>(
            r#"
            SELECT year, month
            FROM reading
            WHERE year < $1
               OR (year = $1 AND month < $2)
            ORDER BY year DESC, month DESC
            LIMIT 1
            "#,
        )
        .bind(period.year())
        .bind(i64::from(period.month()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(year, month)| period_from_row(year, month)).transpose()
    }

    async fn clear_readings_for_period(&self, period: Period) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM reading WHERE year = $1 AND month = $2")
            .bind(period.year())
            .bind(i64::from(period.month()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn clear_readings(&self) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM reading").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
