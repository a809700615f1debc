pub mod engine;
pub mod error;
pub mod logging;

pub use engine::{AnalysisReport, AnalyticsEngine};
pub use error::EngineError;
pub use logging::{init_json_tracing, init_tracing};

pub use vantage_drift::DriftError;
pub use vantage_fairness::FairnessError;
pub use vantage_profile::DataProfileError;
pub use vantage_settings::{StoreSettings, VantageConfig};
pub use vantage_store::{MetricStore, StoreOptions};
pub use vantage_types::*;
