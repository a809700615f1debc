use crate::backend::{IndexRecord, InsertOutcome, MetricBackend};
use crate::error::StoreError;
use crate::sql::query::Queries;
use crate::sql::schema::{CacheEntryRow, CacheIndexRow};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, Transaction};
use std::str::FromStr;
use tracing::{debug, error, info, instrument};
use vantage_settings::StoreSettings;
use vantage_types::{CacheEntry, CacheKey, ColumnDrift, MetricRecord};

/// SQLite-backed metric storage.
///
/// Every entry is one `cache_index` row holding the serialized record, plus
/// denormalized per-column / per-group rows in `profiles`, `drift` or
/// `fairness`, all written in one transaction.
#[derive(Debug, Clone)]
pub struct SqlMetricBackend {
    pub pool: Pool<Sqlite>,
}

impl SqlMetricBackend {
    /// Connect, create the database file if needed and run migrations.
    pub async fn new(settings: &StoreSettings) -> Result<Self, StoreError> {
        let pool = Self::create_db_pool(settings).await?;
        let backend = Self { pool };

        backend.run_migrations().await?;

        Ok(backend)
    }

    /// Wrap an existing pool. Migrations are run.
    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self, StoreError> {
        let backend = Self { pool };
        backend.run_migrations().await?;
        Ok(backend)
    }

    #[instrument(skip(settings))]
    pub async fn create_db_pool(settings: &StoreSettings) -> Result<Pool<Sqlite>, StoreError> {
        let options = SqliteConnectOptions::from_str(&settings.database_uri)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        // every connection to an in-memory database sees its own database
        let in_memory = settings.sqlite_path().is_none();
        let max_connections = if in_memory { 1 } else { settings.max_connections };

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        match pool_options.connect_with(options).await {
            Ok(pool) => {
                info!("✅ Successfully connected to metric store");
                Ok(pool)
            }
            Err(err) => {
                error!("🚨 Failed to connect to metric store {:?}", err);
                Err(err.into())
            }
        }
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        info!("Running migrations");
        sqlx::migrate!("src/migrations").run(&self.pool).await?;

        debug!("Migrations complete");

        Ok(())
    }

    async fn insert_details(
        tx: &mut Transaction<'_, Sqlite>,
        entry: &CacheEntry,
    ) -> Result<(), StoreError> {
        let key = &entry.key;
        let storage_key = key.storage_key();

        match &entry.record {
            MetricRecord::Profile(profile) => {
                let query = Queries::InsertProfileColumn.get_query();
                for (name, column) in &profile.columns {
                    sqlx::query(&query.sql)
                        .bind(&storage_key)
                        .bind(key.dataset.as_str())
                        .bind(key.config.as_str())
                        .bind(name)
                        .bind(column.kind.to_string())
                        .bind(column.count as i64)
                        .bind(column.null_count as i64)
                        .bind(serde_json::to_string(column)?)
                        .execute(&mut **tx)
                        .await?;
                }
            }
            MetricRecord::Drift(report) => {
                let query = Queries::InsertDriftColumn.get_query();
                let reference = key.reference.as_ref().map(|r| r.as_str()).unwrap_or("");
                for (name, drift) in &report.columns {
                    let (status, psi, kl, tier, drifted) = match drift {
                        ColumnDrift::Computed(result) => (
                            "computed".to_string(),
                            Some(result.psi),
                            Some(result.kl),
                            Some(result.tier.to_string()),
                            Some(result.drifted),
                        ),
                        ColumnDrift::Skipped { reason } => (
                            format!("skipped:{}", serde_json::to_string(reason)?),
                            None,
                            None,
                            None,
                            None,
                        ),
                    };

                    sqlx::query(&query.sql)
                        .bind(&storage_key)
                        .bind(key.dataset.as_str())
                        .bind(reference)
                        .bind(key.config.as_str())
                        .bind(name)
                        .bind(status)
                        .bind(psi)
                        .bind(kl)
                        .bind(tier)
                        .bind(drifted)
                        .execute(&mut **tx)
                        .await?;
                }
            }
            MetricRecord::Fairness(report) => {
                let query = Queries::InsertFairnessGroup.get_query();
                for group in &report.groups {
                    sqlx::query(&query.sql)
                        .bind(&storage_key)
                        .bind(key.dataset.as_str())
                        .bind(key.config.as_str())
                        .bind(&group.group)
                        .bind(group.group_size as i64)
                        .bind(group.selection_rate)
                        .bind(group.disparate_impact.value())
                        .bind(group.low_confidence)
                        .bind(group.is_reference)
                        .execute(&mut **tx)
                        .await?;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl MetricBackend for SqlMetricBackend {
    #[instrument(skip_all)]
    async fn load_index(&self) -> Result<Vec<IndexRecord>, StoreError> {
        let query = Queries::GetCacheIndex.get_query();
        let rows: Vec<CacheIndexRow> = sqlx::query_as(&query.sql).fetch_all(&self.pool).await?;

        rows.into_iter().map(IndexRecord::try_from).collect()
    }

    async fn fetch(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let query = Queries::GetCacheEntry.get_query();
        let row: Option<CacheEntryRow> = sqlx::query_as(&query.sql)
            .bind(key.storage_key())
            .fetch_optional(&self.pool)
            .await?;

        row.map(CacheEntry::try_from).transpose()
    }

    #[instrument(skip_all, fields(key = %entry.key))]
    async fn insert_if_absent(&self, entry: &CacheEntry) -> Result<InsertOutcome, StoreError> {
        let key = &entry.key;
        let query = Queries::InsertCacheIndex.get_query();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(&query.sql)
            .bind(key.storage_key())
            .bind(key.kind.to_string())
            .bind(key.dataset.as_str())
            .bind(key.config.as_str())
            .bind(key.reference.as_ref().map(|r| r.as_str()))
            .bind(entry.computed_at)
            .bind(serde_json::to_string(&entry.config)?)
            .bind(serde_json::to_string(&entry.record)?)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            debug!("Entry already stored, keeping the first write");

            return match self.fetch(key).await? {
                Some(existing) => Ok(InsertOutcome::Existing(existing)),
                None => Err(StoreError::InvalidRow {
                    key: key.storage_key(),
                    reason: "conflicting row disappeared".to_string(),
                }),
            };
        }

        Self::insert_details(&mut tx, entry).await?;
        tx.commit().await?;

        Ok(InsertOutcome::Inserted)
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn remove(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let storage_key = key.storage_key();
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(&Queries::DeleteCacheIndex.get_query().sql)
            .bind(&storage_key)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        for query in [Queries::DeleteProfiles, Queries::DeleteDrift, Queries::DeleteFairness] {
            sqlx::query(&query.get_query().sql)
                .bind(&storage_key)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use sqlx::Row;
    use std::collections::BTreeMap;
    use vantage_types::{
        ConfigFingerprint, DataProfile, DatasetFingerprint, FairnessReport, GroupFairness,
        Statistic,
    };

    async fn backend(dir: &tempfile::TempDir) -> SqlMetricBackend {
        let uri = format!("sqlite://{}", dir.path().join("metrics.db").display());
        SqlMetricBackend::new(&StoreSettings::default().with_database_uri(uri))
            .await
            .unwrap()
    }

    fn profile_entry(dataset: &str) -> CacheEntry {
        CacheEntry {
            key: CacheKey::profile(
                DatasetFingerprint::from_hex(dataset),
                ConfigFingerprint::from_hex("cfg"),
            ),
            record: MetricRecord::Profile(DataProfile {
                row_count: 0,
                columns: BTreeMap::new(),
                correlations: None,
            }),
            computed_at: Utc::now(),
            config: json!({"kind": "profile"}),
        }
    }

    fn fairness_entry() -> CacheEntry {
        let group = |name: &str, rate: f64, reference: bool| GroupFairness {
            group: name.to_string(),
            group_size: 50,
            favorable_count: (rate * 50.0) as usize,
            selection_rate: rate,
            disparate_impact: Statistic::Value(rate / 0.8),
            statistical_parity_difference: rate - 0.8,
            low_confidence: false,
            is_reference: reference,
        };

        CacheEntry {
            key: CacheKey::fairness(
                DatasetFingerprint::from_hex("ds"),
                ConfigFingerprint::from_hex("cfg"),
            ),
            record: MetricRecord::Fairness(FairnessReport {
                sensitive_column: "group".to_string(),
                outcome_column: "selected".to_string(),
                reference_group: "group1".to_string(),
                reference_selection_rate: 0.8,
                overall_selection_rate: 0.6,
                demographic_parity_difference: 0.4,
                excluded_rows: 0,
                groups: vec![group("group1", 0.8, true), group("group2", 0.4, false)],
            }),
            computed_at: Utc::now(),
            config: json!({"kind": "fairness"}),
        }
    }

    #[tokio::test]
    async fn test_insert_fetch_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        let entry = profile_entry("ds1");

        assert_eq!(
            backend.insert_if_absent(&entry).await.unwrap(),
            InsertOutcome::Inserted
        );

        let fetched = backend.fetch(&entry.key).await.unwrap().unwrap();
        assert_eq!(fetched.record, entry.record);
        assert_eq!(fetched.config, entry.config);

        let index = backend.load_index().await.unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].key, entry.key);
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        let first = profile_entry("ds1");
        let mut second = profile_entry("ds1");
        second.config = json!({"kind": "profile", "late": true});

        backend.insert_if_absent(&first).await.unwrap();
        match backend.insert_if_absent(&second).await.unwrap() {
            InsertOutcome::Existing(existing) => assert_eq!(existing.config, first.config),
            InsertOutcome::Inserted => panic!("second write must not replace the first"),
        }
    }

    #[tokio::test]
    async fn test_fairness_rows_are_denormalized() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        let entry = fairness_entry();
        backend.insert_if_absent(&entry).await.unwrap();

        let rows = sqlx::query(
            "SELECT sensitive_value, disparate_impact FROM fairness ORDER BY sensitive_value",
        )
        .fetch_all(&backend.pool)
        .await
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get::<String, _>("sensitive_value"), "group2");
        let di: Option<f64> = rows[1].get("disparate_impact");
        assert!((di.unwrap() - 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        let entry = fairness_entry();
        backend.insert_if_absent(&entry).await.unwrap();

        assert!(backend.remove(&entry.key).await.unwrap());
        assert!(!backend.remove(&entry.key).await.unwrap());
        assert!(backend.fetch(&entry.key).await.unwrap().is_none());

        let remaining: i64 = sqlx::query("SELECT COUNT(*) AS n FROM fairness")
            .fetch_one(&backend.pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let entry = profile_entry("ds1");
        {
            let backend = backend(&dir).await;
            backend.insert_if_absent(&entry).await.unwrap();
            backend.pool.close().await;
        }

        let reopened = backend(&dir).await;
        assert!(reopened.fetch(&entry.key).await.unwrap().is_some());
    }
}
