use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::RecordStore;
use crate::error::StoreError;

/// In-process store backing the engine tests
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<(String, String), Value>>,
    failing_updates: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every update of `id` fail as if the store were unavailable
    pub async fn fail_updates_for(&self, id: &str) {
        self.failing_updates.write().await.insert(id.to_owned());
    }

    /// Insert or overwrite a record without any existence checks
    pub async fn put(&self, collection: &str, id: &str, record: Value) {
        self.records.write().await.insert((collection.to_owned(), id.to_owned()), record);
    }

    fn key(collection: &str, id: &str) -> (String, String) {
        (collection.to_owned(), id.to_owned())
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound { collection: collection.to_owned(), id: id.to_owned() }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let key = Self::key(collection, id);
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists { collection: collection.to_owned(), id: id.to_owned() });
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StoreError> {
        self.records
            .read()
            .await
            .get(&Self::key(collection, id))
            .cloned()
            .ok_or_else(|| Self::not_found(collection, id))
    }

    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        if self.failing_updates.read().await.contains(id) {
            return Err(StoreError::Unavailable(format!("injected failure for {id}")));
        }

        let mut records = self.records.write().await;
        match records.get_mut(&Self::key(collection, id)) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(Self::not_found(collection, id)),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .remove(&Self::key(collection, id))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(collection, id))
    }

    async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .keys()
            .filter(|(c, _)| c == collection)
            .map(|(_, id)| id.clone())
            .collect())
    }
}
