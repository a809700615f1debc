use crate::drift::DriftReport;
use crate::fairness::FairnessReport;
use crate::fingerprint::{ConfigFingerprint, DatasetFingerprint};
use crate::profile::DataProfile;
use crate::util::RecordFuncs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use strum_macros::{Display, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    Profile,
    Drift,
    Fairness,
}

/// A computed metric as emitted to presentation / API collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum MetricRecord {
    Profile(DataProfile),
    Drift(DriftReport),
    Fairness(FairnessReport),
}

impl MetricRecord {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricRecord::Profile(_) => MetricKind::Profile,
            MetricRecord::Drift(_) => MetricKind::Drift,
            MetricRecord::Fairness(_) => MetricKind::Fairness,
        }
    }

    pub fn as_profile(&self) -> Option<&DataProfile> {
        match self {
            MetricRecord::Profile(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_drift(&self) -> Option<&DriftReport> {
        match self {
            MetricRecord::Drift(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_fairness(&self) -> Option<&FairnessReport> {
        match self {
            MetricRecord::Fairness(f) => Some(f),
            _ => None,
        }
    }
}

/// Identity of a cached metric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub dataset: DatasetFingerprint,
    pub config: ConfigFingerprint,
    pub kind: MetricKind,

    /// Reference dataset, drift only.
    pub reference: Option<DatasetFingerprint>,
}

impl CacheKey {
    pub fn profile(dataset: DatasetFingerprint, config: ConfigFingerprint) -> Self {
        Self {
            dataset,
            config,
            kind: MetricKind::Profile,
            reference: None,
        }
    }

    pub fn drift(
        current: DatasetFingerprint,
        reference: DatasetFingerprint,
        config: ConfigFingerprint,
    ) -> Self {
        Self {
            dataset: current,
            config,
            kind: MetricKind::Drift,
            reference: Some(reference),
        }
    }

    pub fn fairness(dataset: DatasetFingerprint, config: ConfigFingerprint) -> Self {
        Self {
            dataset,
            config,
            kind: MetricKind::Fairness,
            reference: None,
        }
    }

    /// Flat string form, used as the primary key in durable storage.
    pub fn storage_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.kind,
            self.dataset,
            self.config,
            self.reference.as_ref().map(|r| r.as_str()).unwrap_or("-")
        )
    }

    /// True when `fingerprint` is either the dataset or the reference of this key.
    pub fn involves(&self, fingerprint: &DatasetFingerprint) -> bool {
        &self.dataset == fingerprint || self.reference.as_ref() == Some(fingerprint)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

/// A stored metric. Never mutated after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub record: MetricRecord,
    pub computed_at: DateTime<Utc>,

    /// Canonical configuration section the record was computed with.
    pub config: Value,
}

impl CacheEntry {
    pub fn pretty_json(&self) -> String {
        RecordFuncs::pretty_json(self)
    }
}
