use sqlx::Error as SqlxError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    SqlxError(#[from] SqlxError),

    #[error("Failed to run migrations")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    #[error(transparent)]
    TypeError(#[from] vantage_types::TypeError),

    #[error(transparent)]
    SettingsError(#[from] vantage_settings::SettingsError),

    #[error("Invalid stored row for {key}: {reason}")]
    InvalidRow { key: String, reason: String },
}

/// Outcome of a failed single-flight computation, shared by every waiter.
#[derive(Error, Debug, Clone)]
pub enum FlightError {
    #[error("Computation failed: {0}")]
    Compute(Arc<dyn std::error::Error + Send + Sync>),

    #[error("Computation panicked: {0}")]
    Panicked(String),

    #[error("Failed to persist computed metric: {0}")]
    Persist(String),

    #[error("Failed to read metric store: {0}")]
    Store(String),

    #[error("Computation was dropped before producing a result")]
    Abandoned,

    #[error("Timed out after {0:?} waiting for the computation")]
    TimedOut(Duration),
}

impl FlightError {
    /// The error returned by the compute closure, if it is of type `E`.
    pub fn compute_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            FlightError::Compute(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<StoreError> for FlightError {
    fn from(err: StoreError) -> Self {
        FlightError::Store(err.to_string())
    }
}
