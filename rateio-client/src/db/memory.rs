use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Storage, StorageError};
use crate::domain::{Apartment, ApartmentReading, Period, Reading};

#[derive(Default)]
struct Tables {
    apartments: Vec<Apartment>,
    readings: Vec<Reading>,
    next_apartment_id: i64,
    next_reading_id: i64,
}

/// Process-local storage with the same ordering guarantees as [`super::SqliteStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // Every mutation completes before the guard drops, so a poisoned lock
        // still holds consistent tables.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn sorted_by_apartment(mut readings: Vec<Reading>) -> Vec<Reading> {
    readings.sort_by_key(|r| r.apartment_id);
    readings
}

#[async_trait]
impl Storage for MemoryStore {
    async fn insert_apartment(&self, block: &str, number: i32) -> Result<Apartment, StorageError> {
        let mut t = self.tables();
        if t.apartments.iter().any(|a| a.is(block, number)) {
            return Err(StorageError::DuplicateApartment {
                block: block.to_string(),
                number,
            });
        }

        t.next_apartment_id += 1;
        let apt = Apartment {
            id: t.next_apartment_id,
            block: block.to_string(),
            number,
        };
        t.apartments.push(apt.clone());
        Ok(apt)
    }

    async fn apartment_by_block_and_number(
        &self,
        block: &str,
        number: i32,
    ) -> Result<Option<Apartment>, StorageError> {
        Ok(self
            .tables()
            .apartments
            .iter()
            .find(|a| a.is(block, number))
            .cloned())
    }

    async fn apartment_by_id(&self, id: i64) -> Result<Option<Apartment>, StorageError> {
        Ok(self.tables().apartments.iter().find(|a| a.id == id).cloned())
    }

    async fn first_apartment(&self) -> Result<Option<Apartment>, StorageError> {
        Ok(self.tables().apartments.iter().min_by_key(|a| a.id).cloned())
    }

    async fn last_apartment(&self) -> Result<Option<Apartment>, StorageError> {
        Ok(self.tables().apartments.iter().max_by_key(|a| a.id).cloned())
    }

    async fn list_apartments(&self) -> Result<Vec<Apartment>, StorageError> {
        let mut apartments = self.tables().apartments.clone();
        apartments.sort_by_key(|a| a.id);
        Ok(apartments)
    }

    async fn count_apartments(&self) -> Result<i64, StorageError> {
        Ok(self.tables().apartments.len() as i64)
    }

    async fn distinct_blocks(&self) -> Result<Vec<String>, StorageError> {
        let mut blocks: Vec<String> = self
            .tables()
            .apartments
            .iter()
            .map(|a| a.block.clone())
            .collect();
        blocks.sort();
        blocks.dedup();
        Ok(blocks)
    }

    async fn clear_apartments(&self) -> Result<(), StorageError> {
        let mut t = self.tables();
        t.readings.clear();
        t.apartments.clear();
        Ok(())
    }

    async fn reading_for(
        &self,
        apartment_id: i64,
        period: Period,
    ) -> Result<Option<Reading>, StorageError> {
        Ok(self
            .tables()
            .readings
            .iter()
            .find(|r| r.apartment_id == apartment_id && r.period == period)
            .cloned())
    }

    async fn reading_by_id(&self, id: i64) -> Result<Option<Reading>, StorageError> {
        Ok(self.tables().readings.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_reading(
        &self,
        apartment_id: i64,
        period: Period,
        value: i64,
    ) -> Result<Reading, StorageError> {
        let mut t = self.tables();
        if !t.apartments.iter().any(|a| a.id == apartment_id) {
            return Err(StorageError::UnknownApartment(apartment_id));
        }
        if t
            .readings
            .iter()
            .any(|r| r.apartment_id == apartment_id && r.period == period)
        {
            return Err(StorageError::DuplicateReading {
                apartment_id,
                period,
            });
        }
        t.next_reading_id += 1;
        let reading = Reading {
            id: t.next_reading_id,
            apartment_id,
            period,
            value,
        };
        t.readings.push(reading.clone());
        Ok(reading)
    }

    async fn update_reading_value(&self, id: i64, value: i64) -> Result<(), StorageError> {
        let mut t = self.tables();
        let reading = t
            .readings
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StorageError::MissingReading(id))?;
        reading.value = value;
        Ok(())
    }

    async fn count_readings(&self, period: Period) -> Result<i64, StorageError> {
        Ok(self
            .tables()
            .readings
            .iter()
            .filter(|r| r.period == period)
            .count() as i64)
    }

    async fn sum_readings(&self, period: Period) -> Result<i64, StorageError> {
        Ok(self
            .tables()
            .readings
            .iter()
            .filter(|r| r.period == period)
            .map(|r| r.value)
            .sum())
    }

    async fn readings_for_period(&self, period: Period) -> Result<Vec<Reading>, StorageError> {
        let readings = self
            .tables()
            .readings
            .iter()
            .filter(|r| r.period == period)
            .cloned()
            .collect();
        Ok(sorted_by_apartment(readings))
    }

    async fn apartment_readings_for_period(
        &self,
        period: Period,
    ) -> Result<Vec<ApartmentReading>, StorageError> {
        let t = self.tables();
        let readings = sorted_by_apartment(
            t.readings
                .iter()
                .filter(|r| r.period == period)
                .cloned()
                .collect(),
        );

        Ok(readings
            .into_iter()
            .filter_map(|r| {
                t.apartments
                    .iter()
                    .find(|a| a.id == r.apartment_id)
                    .map(|a| ApartmentReading {
                        apartment: a.clone(),
                        period: r.period,
                        value: r.value,
                    })
            })
            .collect())
    }

    async fn latest_period_before(&self, period: Period) -> Result<Option<Period>, StorageError> {
        Ok(self
            .tables()
            .readings
            .iter()
            .map(|r| r.period)
            .filter(|p| *p < period)
            .max())
    }

    async fn clear_readings_for_period(&self, period: Period) -> Result<u64, StorageError> {
        let mut t = self.tables();
        let before = t.readings.len();
        t.readings.retain(|r| r.period != period);
        Ok((before - t.readings.len()) as u64)
    }

    async fn clear_readings(&self) -> Result<u64, StorageError> {
        let mut t = self.tables();
        let removed = t.readings.len() as u64;
        t.readings.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn readings_follow_the_schema_constraints() {
        let store = MemoryStore::new();
        let apt = store.insert_apartment("A", 1).await.unwrap();
        let may = Period::new(2024, 5).unwrap();
        store.insert_reading(apt.id, may, 5).await.unwrap();

        assert!(matches!(
            store.insert_reading(apt.id, may, 6).await,
            Err(StorageError::DuplicateReading { .. })
        ));
        assert!(matches!(
            store.insert_reading(apt.id + 10, may, 9).await,
            Err(StorageError::UnknownApartment(_))
        ));

        let joined = store.apartment_readings_for_period(may).await.unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].value, 5);
        assert_eq!(store.count_readings(may).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clearing_one_period_leaves_the_others() {
        let store = MemoryStore::new();
        let apt = store.insert_apartment("A", 1).await.unwrap();
        let april = Period::new(2024, 4).unwrap();
        let may = Period::new(2024, 5).unwrap();
        store.insert_reading(apt.id, april, 5).await.unwrap();
        store.insert_reading(apt.id, may, 8).await.unwrap();

        assert_eq!(store.clear_readings_for_period(april).await.unwrap(), 1);
        assert_eq!(store.count_readings(april).await.unwrap(), 0);
        assert_eq!(store.sum_readings(may).await.unwrap(), 8);
    }
}
