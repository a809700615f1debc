use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypeError {
    #[error("Column '{column}' has {found} rows, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Fairness configuration is required to compute fairness metrics")]
    MissingFairnessConfig,

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

impl TypeError {
    /// True for every variant describing a malformed dataset.
    pub fn is_invalid_schema(&self) -> bool {
        matches!(
            self,
            TypeError::ColumnLengthMismatch { .. } | TypeError::DuplicateColumn(_)
        )
    }
}
