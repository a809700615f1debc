use crate::backend::{IndexRecord, InsertOutcome, MetricBackend};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;
use vantage_types::{CacheEntry, CacheKey};

/// Non-durable backend for tests and short-lived processes.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    storage: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    pub async fn size(&self) -> usize {
        self.storage.read().await.len()
    }
}

#[async_trait]
impl MetricBackend for InMemoryBackend {
    async fn load_index(&self) -> Result<Vec<IndexRecord>, StoreError> {
        Ok(self
            .storage
            .read()
            .await
            .values()
            .map(|entry| IndexRecord {
                key: entry.key.clone(),
                computed_at: entry.computed_at,
            })
            .collect())
    }

    async fn fetch(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.storage.read().await.get(key).cloned())
    }

    #[instrument(skip_all, fields(key = %entry.key))]
    async fn insert_if_absent(&self, entry: &CacheEntry) -> Result<InsertOutcome, StoreError> {
        let mut storage = self.storage.write().await;
        match storage.entry(entry.key.clone()) {
            Entry::Occupied(existing) => Ok(InsertOutcome::Existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool, StoreError> {
        Ok(self.storage.write().await.remove(key).is_some())
    }
}
