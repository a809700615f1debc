use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataProfileError {
    #[error("Column not found in dataset: {0}")]
    ColumnNotFound(String),

    #[error(transparent)]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("Failed to compute correlations: {0}")]
    CorrelationError(#[from] ndarray_stats::errors::EmptyInput),

    #[error(transparent)]
    TypeError(#[from] vantage_types::TypeError),
}
