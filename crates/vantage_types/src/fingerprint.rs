use crate::dataset::{ColumnData, Dataset};
use crate::error::TypeError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

const DATASET_DOMAIN: &[u8] = b"vantage.dataset.v1";
const CONFIG_DOMAIN: &[u8] = b"vantage.config.v1";

const NULL_TAG: u8 = 0;
const VALUE_TAG: u8 = 1;

/// Content identity of a dataset: SHA-256 over schema and values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetFingerprint(String);

/// Identity of the configuration section that shaped a metric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigFingerprint(String);

impl DatasetFingerprint {
    /// Hashes column names in declared order, column kinds, row count and a
    /// per-column digest of the raw values.
    pub fn compute(dataset: &Dataset) -> Result<Self, TypeError> {
        dataset.validate()?;

        let column_digests: Vec<[u8; 32]> = dataset
            .columns()
            .par_iter()
            .map(|column| hash_values(column.data()))
            .collect();

        let mut hasher = Sha256::new();
        hasher.update(DATASET_DOMAIN);
        hasher.update((dataset.column_count() as u64).to_le_bytes());
        hasher.update((dataset.row_count() as u64).to_le_bytes());

        for (column, digest) in dataset.columns().iter().zip(column_digests) {
            write_str(&mut hasher, column.name());
            hasher.update([column.kind().tag()]);
            hasher.update(digest);
        }

        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ConfigFingerprint {
    /// Hashes a canonical JSON section (see `AnalyticsConfig::section`).
    pub fn compute(section: &Value) -> Result<Self, TypeError> {
        let bytes = serde_json::to_vec(section)?;

        let mut hasher = Sha256::new();
        hasher.update(CONFIG_DOMAIN);
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);

        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn write_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn write_option<T>(hasher: &mut Sha256, value: &Option<T>, write: impl Fn(&mut Sha256, &T)) {
    match value {
        Some(v) => {
            hasher.update([VALUE_TAG]);
            write(hasher, v);
        }
        None => hasher.update([NULL_TAG]),
    }
}

fn hash_values(data: &ColumnData) -> [u8; 32] {
    let mut hasher = Sha256::new();

    match data {
        ColumnData::Numeric(values) => values.iter().for_each(|v| {
            write_option(&mut hasher, v, |h, x| h.update(x.to_bits().to_le_bytes()))
        }),
        ColumnData::Categorical(values) | ColumnData::Text(values) => values
            .iter()
            .for_each(|v| write_option(&mut hasher, v, |h, s| write_str(h, s))),
        ColumnData::Boolean(values) => values
            .iter()
            .for_each(|v| write_option(&mut hasher, v, |h, b| h.update([*b as u8]))),
        ColumnData::Datetime(values) => values.iter().for_each(|v| {
            write_option(&mut hasher, v, |h, ts| {
                h.update(ts.timestamp().to_le_bytes());
                h.update(ts.timestamp_subsec_nanos().to_le_bytes());
            })
        }),
    }

    hasher.finalize().into()
}
