use crate::config::DriftMetric;
use crate::dataset::ColumnKind;
use crate::util::RecordFuncs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::Display;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BinType {
    Numeric,
    Category,
}

/// One drift bin. Numeric bins are `(lower_limit, upper_limit]`; a missing
/// limit means the bin is unbounded on that side.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Bin {
    pub id: usize,
    pub label: Option<String>,
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
    pub reference_proportion: f64,
    pub current_proportion: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DriftTier {
    Stable,
    Moderate,
    Significant,
}

impl DriftTier {
    /// Strictly greater than a threshold moves a column up a tier.
    pub fn classify(value: f64, moderate: f64, significant: f64) -> Self {
        if value > significant {
            DriftTier::Significant
        } else if value > moderate {
            DriftTier::Moderate
        } else {
            DriftTier::Stable
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DriftResult {
    pub bin_type: BinType,
    pub psi: f64,

    /// KL(reference || current). Not symmetric.
    pub kl: f64,
    pub tier: DriftTier,
    pub drifted: bool,
    pub bins: Vec<Bin>,
    pub reference_count: usize,
    pub current_count: usize,
    pub reference_nulls: usize,
    pub current_nulls: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    MissingInReference,
    MissingInCurrent,
    KindMismatch {
        reference: ColumnKind,
        current: ColumnKind,
    },
    EmptyReference,
    EmptyCurrent,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ColumnDrift {
    Computed(DriftResult),
    Skipped { reason: SkipReason },
}

impl ColumnDrift {
    pub fn result(&self) -> Option<&DriftResult> {
        match self {
            ColumnDrift::Computed(result) => Some(result),
            ColumnDrift::Skipped { .. } => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            ColumnDrift::Computed(_) => None,
            ColumnDrift::Skipped { reason } => Some(reason),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DriftReport {
    pub reference_rows: usize,
    pub current_rows: usize,
    pub metric: DriftMetric,
    pub columns: BTreeMap<String, ColumnDrift>,
}

impl DriftReport {
    pub fn column(&self, name: &str) -> Option<&ColumnDrift> {
        self.columns.get(name)
    }

    pub fn drifted_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, drift)| drift.result().is_some_and(|r| r.drifted))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn pretty_json(&self) -> String {
        RecordFuncs::pretty_json(self)
    }
}
