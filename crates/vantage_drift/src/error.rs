use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriftError {
    #[error("Reference dataset has {rows} rows, at least {required} are required")]
    ReferenceTooSmall { rows: usize, required: usize },

    #[error("Current dataset has no rows")]
    EmptyCurrent,

    #[error("Insufficient Data Error: {0}")]
    InsufficientDataError(String),

    #[error("{0}")]
    InvalidParameterError(String),

    #[error("{0}")]
    InvalidValueError(String),

    #[error(transparent)]
    MinMaxError(#[from] ndarray_stats::errors::MinMaxError),

    #[error(transparent)]
    TypeError(#[from] vantage_types::TypeError),
}
