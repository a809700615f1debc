use crate::backend::IndexRecord;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use vantage_types::{
    CacheEntry, CacheKey, ConfigFingerprint, DatasetFingerprint, MetricKind, MetricRecord,
};

#[derive(Debug, Clone, FromRow)]
pub struct CacheIndexRow {
    pub storage_key: String,
    pub metric_kind: String,
    pub dataset_fp: String,
    pub config_fp: String,
    pub reference_fp: Option<String>,
    pub computed_at: DateTime<Utc>,
}

impl CacheIndexRow {
    fn key(&self) -> Result<CacheKey, StoreError> {
        let kind = MetricKind::from_str(&self.metric_kind).map_err(|e| StoreError::InvalidRow {
            key: self.storage_key.clone(),
            reason: format!("unknown metric kind '{}': {e}", self.metric_kind),
        })?;

        Ok(CacheKey {
            dataset: DatasetFingerprint::from_hex(self.dataset_fp.as_str()),
            config: ConfigFingerprint::from_hex(self.config_fp.as_str()),
            kind,
            reference: self.reference_fp.as_deref().map(DatasetFingerprint::from_hex),
        })
    }
}

impl TryFrom<CacheIndexRow> for IndexRecord {
    type Error = StoreError;

    fn try_from(row: CacheIndexRow) -> Result<Self, Self::Error> {
        Ok(IndexRecord {
            key: row.key()?,
            computed_at: row.computed_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CacheEntryRow {
    #[sqlx(flatten)]
    pub index: CacheIndexRow,
    pub config: String,
    pub record: String,
}

impl TryFrom<CacheEntryRow> for CacheEntry {
    type Error = StoreError;

    fn try_from(row: CacheEntryRow) -> Result<Self, Self::Error> {
        let key = row.index.key()?;
        let record: MetricRecord = serde_json::from_str(&row.record)?;

        if record.kind() != key.kind {
            return Err(StoreError::InvalidRow {
                key: row.index.storage_key,
                reason: format!("record of kind {} stored under {}", record.kind(), key.kind),
            });
        }

        Ok(CacheEntry {
            key,
            record,
            computed_at: row.index.computed_at,
            config: serde_json::from_str(&row.config)?,
        })
    }
}
