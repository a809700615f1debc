use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use vantage_drift::Drifter;
use vantage_fairness::FairnessAnalyzer;
use vantage_profile::DataProfiler;
use vantage_settings::VantageConfig;
use vantage_store::MetricStore;
use vantage_types::{
    AnalyticsConfig, CacheEntry, CacheKey, DataProfile, Dataset, DatasetFingerprint, DriftReport,
    FairnessReport, MetricKind, RecordFuncs, TypeError,
};

/// Every metric computed for one `analyze` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub dataset: DatasetFingerprint,
    pub reference: Option<DatasetFingerprint>,
    pub profile: DataProfile,
    pub drift: Option<DriftReport>,
    pub fairness: Option<FairnessReport>,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String, TypeError> {
        RecordFuncs::json(self)
    }
}

/// Resolves fingerprints, consults the metric store and runs the engines
/// on a miss.
#[derive(Clone)]
pub struct AnalyticsEngine {
    store: MetricStore,
}

impl AnalyticsEngine {
    pub fn new(store: MetricStore) -> Self {
        Self { store }
    }

    /// Engine over the durable store described by `config`.
    pub async fn open(config: &VantageConfig) -> Result<Self, EngineError> {
        config.prepare_storage()?;
        let store = MetricStore::from_settings(&config.store_settings).await?;
        info!(entries = store.len(), "Analytics engine ready");
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &MetricStore {
        &self.store
    }

    /// Content fingerprint, hashed off the async workers.
    pub async fn fingerprint(
        &self,
        dataset: &Arc<Dataset>,
    ) -> Result<DatasetFingerprint, EngineError> {
        let dataset = dataset.clone();
        let fingerprint = tokio::task::spawn_blocking(move || dataset.fingerprint()).await??;
        Ok(fingerprint)
    }

    async fn profile_for(
        &self,
        dataset: Arc<Dataset>,
        fingerprint: DatasetFingerprint,
        config: &AnalyticsConfig,
    ) -> Result<DataProfile, EngineError> {
        let section = config.section(MetricKind::Profile)?;
        let key = CacheKey::profile(fingerprint, config.fingerprint(MetricKind::Profile)?);

        let profiler = DataProfiler::new(config.profile.clone());
        let columns = config.canonical_columns();

        let entry = self
            .store
            .get_or_compute(key, section, move || {
                profiler
                    .profile(&dataset, columns.as_deref())
                    .map(vantage_types::MetricRecord::Profile)
            })
            .await?;

        expect_record(&entry, MetricKind::Profile, |r| r.as_profile().cloned())
    }

    async fn drift_for(
        &self,
        reference: Arc<Dataset>,
        reference_fp: DatasetFingerprint,
        current: Arc<Dataset>,
        current_fp: DatasetFingerprint,
        config: &AnalyticsConfig,
    ) -> Result<DriftReport, EngineError> {
        let section = config.section(MetricKind::Drift)?;
        let key = CacheKey::drift(
            current_fp,
            reference_fp,
            config.fingerprint(MetricKind::Drift)?,
        );

        let drift_config = config.drift.clone();
        let columns = config.canonical_columns();

        let entry = self
            .store
            .get_or_compute(key, section, move || {
                Drifter::new()
                    .compute_drift(&reference, &current, columns.as_deref(), &drift_config)
                    .map(vantage_types::MetricRecord::Drift)
            })
            .await?;

        expect_record(&entry, MetricKind::Drift, |r| r.as_drift().cloned())
    }

    async fn fairness_for(
        &self,
        dataset: Arc<Dataset>,
        fingerprint: DatasetFingerprint,
        config: &AnalyticsConfig,
    ) -> Result<FairnessReport, EngineError> {
        let section = config.section(MetricKind::Fairness)?;
        let key = CacheKey::fairness(fingerprint, config.fingerprint(MetricKind::Fairness)?);

        let fairness_config = config
            .fairness
            .clone()
            .ok_or(TypeError::MissingFairnessConfig)?;

        let entry = self
            .store
            .get_or_compute(key, section, move || {
                FairnessAnalyzer::new()
                    .compute(&dataset, &fairness_config)
                    .map(vantage_types::MetricRecord::Fairness)
            })
            .await?;

        expect_record(&entry, MetricKind::Fairness, |r| r.as_fairness().cloned())
    }

    /// Per-column profile of `dataset`, served from the store when present.
    #[instrument(skip_all)]
    pub async fn profile(
        &self,
        dataset: Arc<Dataset>,
        config: &AnalyticsConfig,
    ) -> Result<DataProfile, EngineError> {
        let fingerprint = self.fingerprint(&dataset).await?;
        self.profile_for(dataset, fingerprint, config).await
    }

    /// Drift of `current` against `reference`.
    #[instrument(skip_all)]
    pub async fn drift(
        &self,
        reference: Arc<Dataset>,
        current: Arc<Dataset>,
        config: &AnalyticsConfig,
    ) -> Result<DriftReport, EngineError> {
        let (reference_fp, current_fp) =
            tokio::try_join!(self.fingerprint(&reference), self.fingerprint(&current))?;
        self.drift_for(reference, reference_fp, current, current_fp, config)
            .await
    }

    /// Group fairness of `dataset`. Requires `config.fairness`.
    #[instrument(skip_all)]
    pub async fn fairness(
        &self,
        dataset: Arc<Dataset>,
        config: &AnalyticsConfig,
    ) -> Result<FairnessReport, EngineError> {
        let fingerprint = self.fingerprint(&dataset).await?;
        self.fairness_for(dataset, fingerprint, config).await
    }

    /// Profile `current`, plus drift when a reference is given and fairness
    /// when `config.fairness` is set. The metrics are resolved concurrently.
    ///
    /// # Arguments
    ///
    /// * `current` - Dataset under analysis
    /// * `reference` - Baseline for drift
    /// * `config` - Computation configuration
    ///
    /// # Returns
    ///
    /// * `AnalysisReport` - Fails as a whole if any requested metric fails
    #[instrument(skip_all)]
    pub async fn analyze(
        &self,
        current: Arc<Dataset>,
        reference: Option<Arc<Dataset>>,
        config: &AnalyticsConfig,
    ) -> Result<AnalysisReport, EngineError> {
        let current_fp = self.fingerprint(&current).await?;
        let reference_fp = match &reference {
            Some(reference) => Some(self.fingerprint(reference).await?),
            None => None,
        };

        let profile = self.profile_for(current.clone(), current_fp.clone(), config);

        let drift = async {
            match (&reference, &reference_fp) {
                (Some(reference), Some(reference_fp)) => self
                    .drift_for(
                        reference.clone(),
                        reference_fp.clone(),
                        current.clone(),
                        current_fp.clone(),
                        config,
                    )
                    .await
                    .map(Some),
                _ => Ok(None),
            }
        };

        let fairness = async {
            if config.fairness.is_some() {
                self.fairness_for(current.clone(), current_fp.clone(), config)
                    .await
                    .map(Some)
            } else {
                Ok(None)
            }
        };

        let (profile, drift, fairness) = tokio::try_join!(profile, drift, fairness)?;

        debug!(dataset = %current_fp, "Analysis complete");

        Ok(AnalysisReport {
            dataset: current_fp,
            reference: reference_fp,
            profile,
            drift,
            fairness,
        })
    }
}

fn expect_record<T>(
    entry: &CacheEntry,
    expected: MetricKind,
    extract: impl FnOnce(&vantage_types::MetricRecord) -> Option<T>,
) -> Result<T, EngineError> {
    extract(&entry.record).ok_or(EngineError::UnexpectedRecord { expected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_types::{Column, FairnessConfig};

    async fn engine() -> AnalyticsEngine {
        AnalyticsEngine::new(MetricStore::in_memory().await.unwrap())
    }

    fn dataset() -> Arc<Dataset> {
        Arc::new(
            Dataset::new(vec![
                Column::numeric_values("income", (0..40).map(|x| x as f64 * 1.5)),
                Column::categorical_values(
                    "group",
                    (0..40).map(|x| if x % 3 == 0 { "a" } else { "b" }),
                ),
                Column::boolean_values("approved", (0..40).map(|x| x % 2 == 0)),
            ])
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_analyze_without_reference_or_fairness() {
        let engine = engine().await;

        let report = engine
            .analyze(dataset(), None, &AnalyticsConfig::default())
            .await
            .unwrap();

        assert_eq!(report.profile.row_count, 40);
        assert!(report.drift.is_none());
        assert!(report.fairness.is_none());
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn test_fairness_requires_config() {
        let engine = engine().await;

        let err = engine
            .fairness(dataset(), &AnalyticsConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::TypeError(TypeError::MissingFairnessConfig)
        ));
    }

    #[tokio::test]
    async fn test_compute_failure_is_recoverable() {
        let engine = engine().await;
        let config = AnalyticsConfig::default().with_columns(["missing"]);

        let err = engine.profile(dataset(), &config).await.unwrap_err();

        assert!(err.profile_error().is_some());
        assert!(engine.store().is_empty());
    }

    #[tokio::test]
    async fn test_each_metric_kind_is_cached_separately() {
        let engine = engine().await;
        let config =
            AnalyticsConfig::default().with_fairness(FairnessConfig::new("group", "approved"));

        let report = engine
            .analyze(dataset(), Some(dataset()), &config)
            .await
            .unwrap();

        assert_eq!(report.reference.as_ref(), Some(&report.dataset));
        assert!(report.drift.unwrap().drifted_columns().is_empty());
        assert_eq!(report.fairness.unwrap().groups.len(), 2);
        assert_eq!(engine.store().len(), 3);
    }
}
