use std::sync::Arc;

use rateio_client::{
    db::{Storage, StorageError},
    domain::Apartment,
};

use super::EngineError;

/// Ordered roster of apartments.
///
/// Navigation is id arithmetic: the neighbours of an apartment are the ids
/// directly above and below it, whatever block they belong to.
#[derive(Clone)]
pub struct ApartmentRegistry {
    storage: Arc<dyn Storage>,
}

impl ApartmentRegistry {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn register(&self, block: &str, number: i32) -> Result<Apartment, StorageError> {
        let apt = self.storage.insert_apartment(block, number).await?;
        tracing::debug!(id = apt.id, block, number, "apartment registered");
        Ok(apt)
    }

    pub async fn get_by_block_and_number(
        &self,
        block: &str,
        number: i32,
    ) -> Result<Option<Apartment>, EngineError> {
        Ok(self.storage.apartment_by_block_and_number(block, number).await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Apartment>, EngineError> {
        Ok(self.storage.apartment_by_id(id).await?)
    }

    pub async fn exists(&self, block: &str, number: i32) -> Result<bool, EngineError> {
        Ok(self.get_by_block_and_number(block, number).await?.is_some())
    }

    pub async fn get_first(&self) -> Result<Apartment, EngineError> {
        self.storage
            .first_apartment()
            .await?
            .ok_or(EngineError::EmptyRoster)
    }

    pub async fn get_last(&self) -> Result<Apartment, EngineError> {
        self.storage
            .last_apartment()
            .await?
            .ok_or(EngineError::EmptyRoster)
    }

    /// Apartment registered right after `(block, number)`; `None` past the end
    /// or when `(block, number)` is not registered.
    pub async fn get_next(&self, block: &str, number: i32) -> Result<Option<Apartment>, EngineError> {
        self.neighbour(block, number, 1).await
    }

    pub async fn get_previous(
        &self,
        block: &str,
        number: i32,
    ) -> Result<Option<Apartment>, EngineError> {
        self.neighbour(block, number, -1).await
    }

    async fn neighbour(
        &self,
        block: &str,
        number: i32,
        step: i64,
    ) -> Result<Option<Apartment>, EngineError> {
        let Some(apt) = self.get_by_block_and_number(block, number).await? else {
            return Ok(None);
        };
        match apt.id.checked_add(step) {
            Some(id) => self.get_by_id(id).await,
            None => Ok(None),
        }
    }

    pub async fn is_first(&self, block: &str, number: i32) -> Result<bool, EngineError> {
        Ok(self
            .storage
            .first_apartment()
            .await?
            .is_some_and(|first| first.is(block, number)))
    }

    pub async fn is_last(&self, block: &str, number: i32) -> Result<bool, EngineError> {
        Ok(self
            .storage
            .last_apartment()
            .await?
            .is_some_and(|last| last.is(block, number)))
    }

    pub async fn list_distinct_blocks(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.storage.distinct_blocks().await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Apartment>, EngineError> {
        Ok(self.storage.list_apartments().await?)
    }

    pub async fn count(&self) -> Result<i64, EngineError> {
        Ok(self.storage.count_apartments().await?)
    }

    /// Drop the whole roster together with every reading.
    pub async fn clear(&self) -> Result<(), EngineError> {
        self.storage.clear_apartments().await?;
        tracing::warn!("apartment roster cleared");
        Ok(())
    }
}
