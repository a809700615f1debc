use approx::assert_relative_eq;
use std::sync::Arc;
use tempfile::TempDir;
use vantage_engine::{
    AnalyticsConfig, AnalyticsEngine, BinType, Column, Dataset, DriftError, DriftTier,
    FairnessConfig, MetricStore, Statistic, StoreSettings, VantageConfig,
};

async fn engine() -> AnalyticsEngine {
    vantage_engine::init_tracing();
    AnalyticsEngine::new(MetricStore::in_memory().await.unwrap())
}

fn sqlite_config(dir: &TempDir) -> VantageConfig {
    VantageConfig {
        store_settings: StoreSettings::default().with_database_uri(format!(
            "sqlite://{}",
            dir.path().join("store").join("metrics.db").display()
        )),
    }
}

fn loans() -> Arc<Dataset> {
    let rows = 100;
    Arc::new(
        Dataset::new(vec![
            Column::numeric_values(
                "income",
                (0..rows).map(|i| 20_000.0 + (i * 37 % 91) as f64 * 500.0),
            ),
            Column::numeric(
                "age",
                (0..rows).map(|i| (i % 7 != 0).then_some(20.0 + (i % 45) as f64)),
            ),
            Column::categorical_values(
                "region",
                (0..rows).map(|i| ["north", "south", "east"][i % 3]),
            ),
            Column::boolean_values("approved", (0..rows).map(|i| i % 5 < 3)),
        ])
        .unwrap(),
    )
}

#[tokio::test]
async fn test_scenario_identical_numeric_is_stable() {
    let values = vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0];
    let reference =
        Arc::new(Dataset::new(vec![Column::numeric_values("x", values.clone())]).unwrap());
    let current = Arc::new(Dataset::new(vec![Column::numeric_values("x", values)]).unwrap());

    let report = engine()
        .await
        .drift(reference, current, &AnalyticsConfig::default())
        .await
        .unwrap();
    let x = report.column("x").unwrap().result().unwrap();

    assert_eq!(x.psi, 0.0);
    assert_eq!(x.tier, DriftTier::Stable);
    assert!(!x.drifted);
}

#[tokio::test]
async fn test_scenario_disjoint_categories_are_significant() {
    let reference =
        Arc::new(Dataset::new(vec![Column::categorical_values("c", vec!["A"; 100])]).unwrap());
    let current =
        Arc::new(Dataset::new(vec![Column::categorical_values("c", vec!["B"; 100])]).unwrap());
    let config = AnalyticsConfig::default();

    let report = engine().await.drift(reference, current, &config).await.unwrap();
    let c = report.column("c").unwrap().result().unwrap();
    let eps = config.drift.smoothing_epsilon;

    assert_eq!(c.bin_type, BinType::Category);
    assert_relative_eq!(c.psi, 2.0 * (1.0 - eps) * (1.0 / eps).ln(), epsilon = 1e-9);
    assert_eq!(c.tier, DriftTier::Significant);
    assert!(c.drifted);
}

#[tokio::test]
async fn test_scenario_two_group_fairness() {
    let sensitive = (0..100).map(|i| if i < 50 { "group1" } else { "group2" });
    let outcome = (0..100).map(|i| if i < 50 { i < 40 } else { i < 70 });
    let dataset = Arc::new(
        Dataset::new(vec![
            Column::categorical_values("group", sensitive),
            Column::boolean_values("hired", outcome),
        ])
        .unwrap(),
    );
    let config = AnalyticsConfig::default()
        .with_fairness(FairnessConfig::new("group", "hired").with_reference_group("group1"));

    let report = engine().await.fairness(dataset, &config).await.unwrap();
    let group2 = report.group("group2").unwrap();

    assert_relative_eq!(report.group("group1").unwrap().selection_rate, 0.8);
    assert_relative_eq!(group2.selection_rate, 0.4);
    assert_relative_eq!(group2.disparate_impact.value().unwrap(), 0.5);
    assert_relative_eq!(group2.statistical_parity_difference, -0.4, epsilon = 1e-12);
}

#[tokio::test]
async fn test_scenario_constant_column_profile() {
    let dataset = Arc::new(Dataset::new(vec![Column::numeric_values("v", vec![5.0; 5])]).unwrap());

    let profile = engine()
        .await
        .profile(dataset, &AnalyticsConfig::default())
        .await
        .unwrap();
    let stats = profile.column("v").unwrap().numeric_stats.as_ref().unwrap();

    assert_eq!(stats.stddev, Statistic::Value(0.0));
    assert!(stats.skewness.is_undefined());
    assert!(stats.kurtosis.is_undefined());
}

#[tokio::test]
async fn test_all_null_column_profiles_as_undefined() {
    let dataset = Arc::new(Dataset::new(vec![Column::numeric("n", vec![None; 8])]).unwrap());

    let profile = engine()
        .await
        .profile(dataset, &AnalyticsConfig::default())
        .await
        .unwrap();
    let column = profile.column("n").unwrap();
    let stats = column.numeric_stats.as_ref().unwrap();

    assert_eq!(column.count, 8);
    assert_eq!(column.non_null_count, 0);
    assert!(stats.mean.is_undefined());
    assert!(stats.stddev.is_undefined());
    assert!(stats.min.is_undefined());
}

#[tokio::test]
async fn test_results_are_deterministic_across_stores() {
    let config = AnalyticsConfig::default()
        .with_fairness(FairnessConfig::new("region", "approved"));

    let first = engine()
        .await
        .analyze(loans(), Some(loans()), &config)
        .await
        .unwrap();
    let second = engine()
        .await
        .analyze(loans(), Some(loans()), &config)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[tokio::test]
async fn test_repeated_analysis_is_served_from_cache() {
    let engine = engine().await;
    let config = AnalyticsConfig::default();

    let first = engine.analyze(loans(), None, &config).await.unwrap();
    let second = engine.analyze(loans(), None, &config).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.store().len(), 1);

    // drift thresholds are not part of the profile key
    let mut tuned = config.clone();
    tuned.drift.drift_threshold_significant = 0.5;
    engine.analyze(loans(), None, &tuned).await.unwrap();
    assert_eq!(engine.store().len(), 1);

    // a different column selection is a new key
    engine
        .analyze(loans(), None, &config.clone().with_columns(["income"]))
        .await
        .unwrap();
    assert_eq!(engine.store().len(), 2);
}

#[tokio::test]
async fn test_reference_too_small_surfaces_drift_error() {
    let reference =
        Arc::new(Dataset::new(vec![Column::numeric_values("x", vec![1.0, 2.0])]).unwrap());

    let err = engine()
        .await
        .drift(reference, loans(), &AnalyticsConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err.drift_error(),
        Some(DriftError::ReferenceTooSmall { rows: 2, .. })
    ));
}

#[tokio::test]
async fn test_durable_engine_rehydrates() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(&dir);
    let analytics = AnalyticsConfig::default()
        .with_fairness(FairnessConfig::new("region", "approved"));

    let first = {
        let engine = AnalyticsEngine::open(&config).await.unwrap();
        engine.analyze(loans(), Some(loans()), &analytics).await.unwrap()
    };

    let engine = AnalyticsEngine::open(&config).await.unwrap();
    assert_eq!(engine.store().len(), 3);

    let second = engine
        .analyze(loans(), Some(loans()), &analytics)
        .await
        .unwrap();
    assert_eq!(first, second);
}
