use thiserror::Error;
use vantage_types::ColumnKind;

#[derive(Error, Debug)]
pub enum FairnessError {
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Invalid outcome column '{column}' ({kind}): {reason}")]
    InvalidOutcomeColumn {
        column: String,
        kind: ColumnKind,
        reason: String,
    },

    #[error("Reference group '{0}' not present in the sensitive column")]
    ReferenceGroupNotFound(String),

    #[error("No rows with both a sensitive value and an outcome")]
    NoRows,
}

impl FairnessError {
    pub(crate) fn invalid_outcome(
        column: &str,
        kind: ColumnKind,
        reason: impl Into<String>,
    ) -> Self {
        FairnessError::InvalidOutcomeColumn {
            column: column.to_string(),
            kind,
            reason: reason.into(),
        }
    }
}
