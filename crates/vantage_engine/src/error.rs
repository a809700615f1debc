use thiserror::Error;
use vantage_drift::DriftError;
use vantage_fairness::FairnessError;
use vantage_profile::DataProfileError;
use vantage_store::{FlightError, StoreError};
use vantage_types::MetricKind;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    TypeError(#[from] vantage_types::TypeError),

    #[error(transparent)]
    SettingsError(#[from] vantage_settings::SettingsError),

    #[error(transparent)]
    StoreError(#[from] StoreError),

    #[error(transparent)]
    FlightError(#[from] FlightError),

    #[error("Fingerprinting task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    #[error("Stored record for a {expected} key has a different kind")]
    UnexpectedRecord { expected: MetricKind },
}

impl EngineError {
    fn compute_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            EngineError::FlightError(err) => err.compute_error::<E>(),
            _ => None,
        }
    }

    /// The profiling failure behind this error, if any.
    pub fn profile_error(&self) -> Option<&DataProfileError> {
        self.compute_error()
    }

    pub fn drift_error(&self) -> Option<&DriftError> {
        self.compute_error()
    }

    pub fn fairness_error(&self) -> Option<&FairnessError> {
        self.compute_error()
    }
}
