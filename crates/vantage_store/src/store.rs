use crate::backend::{InMemoryBackend, InsertOutcome, MetricBackend};
use crate::error::{FlightError, StoreError};
use crate::sql::SqlMetricBackend;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mini_moka::sync::Cache;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use vantage_settings::StoreSettings;
use vantage_types::{CacheEntry, CacheKey, DatasetFingerprint, MetricRecord};

type FlightResult = Result<Arc<CacheEntry>, FlightError>;
type FlightReceiver = watch::Receiver<Option<FlightResult>>;

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Entries older than this are misses. `None` disables expiry.
    pub ttl: Option<Duration>,
    pub hot_cache_capacity: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            hot_cache_capacity: 1000,
        }
    }
}

impl From<&StoreSettings> for StoreOptions {
    fn from(settings: &StoreSettings) -> Self {
        Self {
            ttl: settings.ttl(),
            hot_cache_capacity: settings.hot_cache_capacity,
        }
    }
}

struct StoreInner {
    backend: Arc<dyn MetricBackend>,

    /// Every durable entry, keyed to its computation time.
    index: DashMap<CacheKey, DateTime<Utc>>,

    /// Deserialized entries in front of the backend.
    hot: Cache<CacheKey, Arc<CacheEntry>>,

    /// One receiver per running computation.
    inflight: DashMap<CacheKey, FlightReceiver>,

    ttl: Option<chrono::Duration>,
}

/// Removes the in-flight marker when a computation task ends, whether it
/// finished, failed or was dropped.
struct FlightGuard {
    inner: Arc<StoreInner>,
    key: CacheKey,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.inner.inflight.remove(&self.key);
    }
}

/// Metric cache with at-most-one concurrent computation per key.
///
/// Lookups go index -> hot cache -> backend. A miss starts one computation
/// task; concurrent callers for the same key subscribe to its result instead
/// of computing again. Success and failure are both broadcast to every
/// waiter. Failures are not cached and are not retried.
#[derive(Clone)]
pub struct MetricStore {
    inner: Arc<StoreInner>,
}

impl MetricStore {
    /// Build a store over `backend` and rehydrate the index from it.
    pub async fn open(
        backend: Arc<dyn MetricBackend>,
        options: StoreOptions,
    ) -> Result<Self, StoreError> {
        let ttl = options.ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok());

        let store = Self {
            inner: Arc::new(StoreInner {
                backend,
                index: DashMap::new(),
                hot: Cache::new(options.hot_cache_capacity),
                inflight: DashMap::new(),
                ttl,
            }),
        };

        let records = store.inner.backend.load_index().await?;
        let count = records.len();
        for record in records {
            store.inner.index.insert(record.key, record.computed_at);
        }
        info!(entries = count, "Rehydrated metric index");

        Ok(store)
    }

    /// SQLite-backed store configured from settings.
    pub async fn from_settings(settings: &StoreSettings) -> Result<Self, StoreError> {
        let backend = SqlMetricBackend::new(settings).await?;
        Self::open(Arc::new(backend), StoreOptions::from(settings)).await
    }

    /// Non-durable store.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::open(Arc::new(InMemoryBackend::new()), StoreOptions::default()).await
    }

    pub fn len(&self) -> usize {
        self.inner.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.index.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.index.contains_key(key)
    }

    /// Number of computations currently running.
    pub fn inflight(&self) -> usize {
        self.inner.inflight.len()
    }

    fn is_expired(&self, computed_at: DateTime<Utc>) -> bool {
        match self.inner.ttl {
            Some(ttl) => Utc::now() - computed_at > ttl,
            None => false,
        }
    }

    fn is_fresh(&self, key: &CacheKey) -> bool {
        self.inner
            .index
            .get(key)
            .is_some_and(|computed_at| !self.is_expired(*computed_at))
    }

    fn remember(&self, entry: &Arc<CacheEntry>) {
        self.inner
            .index
            .insert(entry.key.clone(), entry.computed_at);
        self.inner.hot.insert(entry.key.clone(), entry.clone());
    }

    /// Stored entry for `key`, if present and not expired.
    pub async fn lookup(&self, key: &CacheKey) -> Result<Option<Arc<CacheEntry>>, StoreError> {
        let computed_at = match self.inner.index.get(key) {
            Some(computed_at) => *computed_at,
            None => return Ok(None),
        };

        if self.is_expired(computed_at) {
            debug!(%key, "Entry expired");
            self.invalidate(key).await?;
            return Ok(None);
        }

        if let Some(entry) = self.inner.hot.get(key) {
            return Ok(Some(entry));
        }

        match self.inner.backend.fetch(key).await? {
            Some(entry) => {
                let entry = Arc::new(entry);
                self.inner.hot.insert(key.clone(), entry.clone());
                Ok(Some(entry))
            }
            None => {
                warn!(%key, "Indexed entry missing from backend");
                self.inner.index.remove(key);
                Ok(None)
            }
        }
    }

    /// Return the stored metric for `key`, computing it at most once across
    /// concurrent callers.
    ///
    /// `compute` runs on the blocking pool in a task owned by the store, so a
    /// caller that stops waiting does not cancel it for the others. The
    /// first result persisted for a key wins; a later result for the same key
    /// is discarded and the stored one returned.
    ///
    /// # Arguments
    ///
    /// * `key` - Cache identity of the metric
    /// * `config` - Canonical configuration section, stored alongside the record
    /// * `compute` - Produces the record on a miss
    #[instrument(skip_all, fields(key = %key))]
    pub async fn get_or_compute<F, E>(
        &self,
        key: CacheKey,
        config: Value,
        compute: F,
    ) -> Result<Arc<CacheEntry>, FlightError>
    where
        F: FnOnce() -> Result<MetricRecord, E> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut compute = Some(compute);

        loop {
            if let Some(entry) = self.lookup(&key).await? {
                debug!("Cache hit");
                return Ok(entry);
            }

            let receiver = match self.inner.inflight.entry(key.clone()) {
                Entry::Occupied(flight) => {
                    debug!("Joining running computation");
                    Some(flight.get().clone())
                }
                // a flight may have finished between the lookup and here
                Entry::Vacant(_) if self.is_fresh(&key) => None,
                Entry::Vacant(slot) => match compute.take() {
                    Some(compute) => {
                        let (tx, rx) = watch::channel(None);
                        slot.insert(rx.clone());
                        self.spawn_flight(key.clone(), config.clone(), compute, tx);
                        Some(rx)
                    }
                    None => return Err(FlightError::Abandoned),
                },
            };

            match receiver {
                Some(rx) => return Self::wait(rx).await,
                None => continue,
            }
        }
    }

    /// As [`MetricStore::get_or_compute`], bounding only this caller's wait.
    pub async fn get_or_compute_with_timeout<F, E>(
        &self,
        key: CacheKey,
        config: Value,
        compute: F,
        timeout: Duration,
    ) -> Result<Arc<CacheEntry>, FlightError>
    where
        F: FnOnce() -> Result<MetricRecord, E> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        tokio::time::timeout(timeout, self.get_or_compute(key, config, compute))
            .await
            .map_err(|_| FlightError::TimedOut(timeout))?
    }

    async fn wait(mut rx: FlightReceiver) -> FlightResult {
        match rx.wait_for(Option::is_some).await {
            Ok(result) => match result.as_ref() {
                Some(result) => result.clone(),
                None => Err(FlightError::Abandoned),
            },
            Err(_) => Err(FlightError::Abandoned),
        }
    }

    fn spawn_flight<F, E>(
        &self,
        key: CacheKey,
        config: Value,
        compute: F,
        tx: watch::Sender<Option<FlightResult>>,
    ) where
        F: FnOnce() -> Result<MetricRecord, E> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let store = self.clone();

        tokio::spawn(async move {
            let guard = FlightGuard {
                inner: store.inner.clone(),
                key: key.clone(),
            };

            let result = store.run_flight(&key, config, compute).await;
            if let Err(err) = &result {
                warn!(%key, "Metric computation failed: {err}");
            }

            // waiters hold receiver clones, so the marker can go before they wake
            drop(guard);
            tx.send_replace(Some(result));
        });
    }

    async fn run_flight<F, E>(&self, key: &CacheKey, config: Value, compute: F) -> FlightResult
    where
        F: FnOnce() -> Result<MetricRecord, E> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let record = match tokio::task::spawn_blocking(compute).await {
            Ok(Ok(record)) => record,
            Ok(Err(err)) => return Err(FlightError::Compute(Arc::new(err))),
            Err(join_err) => return Err(FlightError::Panicked(join_err.to_string())),
        };

        let entry = CacheEntry {
            key: key.clone(),
            record,
            computed_at: Utc::now(),
            config,
        };

        let stored = match self.inner.backend.insert_if_absent(&entry).await {
            Ok(InsertOutcome::Inserted) => {
                debug!("Stored new metric");
                entry
            }
            Ok(InsertOutcome::Existing(existing)) => {
                debug!("Discarding late result, an entry is already stored");
                existing
            }
            Err(err) => return Err(FlightError::Persist(err.to_string())),
        };

        let stored = Arc::new(stored);
        self.remember(&stored);
        Ok(stored)
    }

    /// Drop one entry from every layer. Returns whether it was stored.
    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool, StoreError> {
        self.inner.index.remove(key);
        self.inner.hot.invalidate(key);
        self.inner.backend.remove(key).await
    }

    /// Drop every entry computed from `fingerprint`, as dataset or reference.
    pub async fn invalidate_dataset(
        &self,
        fingerprint: &DatasetFingerprint,
    ) -> Result<usize, StoreError> {
        let keys = self
            .inner
            .index
            .iter()
            .filter(|item| item.key().involves(fingerprint))
            .map(|item| item.key().clone())
            .collect::<Vec<_>>();

        for key in &keys {
            self.invalidate(key).await?;
        }

        info!(%fingerprint, removed = keys.len(), "Invalidated dataset");
        Ok(keys.len())
    }

    /// Drop every expired entry. A no-op without a TTL.
    pub async fn purge_expired(&self) -> Result<usize, StoreError> {
        let expired = self
            .inner
            .index
            .iter()
            .filter(|item| self.is_expired(*item.value()))
            .map(|item| item.key().clone())
            .collect::<Vec<_>>();

        for key in &expired {
            self.invalidate(key).await?;
        }

        Ok(expired.len())
    }
}
