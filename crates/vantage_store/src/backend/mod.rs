pub mod memory;

pub use memory::InMemoryBackend;

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vantage_types::{CacheEntry, CacheKey};

/// Index row rehydrated at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub key: CacheKey,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted,

    /// An entry already existed for the key; it is returned unchanged.
    Existing(CacheEntry),
}

/// Durable storage behind the metric store.
///
/// Entries are write-once: `insert_if_absent` never overwrites, so the first
/// writer for a key wins and later writers receive the stored entry.
#[async_trait]
pub trait MetricBackend: Send + Sync + 'static {
    async fn load_index(&self) -> Result<Vec<IndexRecord>, StoreError>;

    async fn fetch(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError>;

    async fn insert_if_absent(&self, entry: &CacheEntry) -> Result<InsertOutcome, StoreError>;

    /// Returns whether an entry was removed.
    async fn remove(&self, key: &CacheKey) -> Result<bool, StoreError>;
}
