use crate::error::TypeError;
use crate::fingerprint::ConfigFingerprint;
use crate::records::MetricKind;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum_macros::Display;

pub const DEFAULT_BIN_COUNT: usize = 10;
pub const DEFAULT_SMOOTHING_EPSILON: f64 = 1e-4;
pub const DEFAULT_THRESHOLD_MODERATE: f64 = 0.1;
pub const DEFAULT_THRESHOLD_SIGNIFICANT: f64 = 0.2;
pub const DEFAULT_MIN_REFERENCE_ROWS: usize = 10;
pub const DEFAULT_MIN_GROUP_SIZE: usize = 30;
pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_HISTOGRAM_BINS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Size of the categorical frequency table.
    pub top_k: usize,

    /// Number of equal-width histogram bins for numeric columns.
    pub histogram_bins: usize,

    pub compute_correlations: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            compute_correlations: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BinningMethod {
    /// Reference quantile edges, stable across current datasets.
    #[default]
    Quantile,

    /// Reference min/max split into equally wide bins.
    EqualWidth,
}

/// Divergence used to classify a column into a drift tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DriftMetric {
    #[default]
    Psi,
    Kl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub bin_count: usize,
    pub binning: BinningMethod,

    /// Substituted for empty bin probabilities before the ratio and log.
    /// Biases PSI and KL upwards for sparse bins.
    pub smoothing_epsilon: f64,

    pub drift_threshold_moderate: f64,
    pub drift_threshold_significant: f64,
    pub metric: DriftMetric,

    /// Reference datasets with fewer rows are rejected.
    pub min_reference_rows: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
            binning: BinningMethod::default(),
            smoothing_epsilon: DEFAULT_SMOOTHING_EPSILON,
            drift_threshold_moderate: DEFAULT_THRESHOLD_MODERATE,
            drift_threshold_significant: DEFAULT_THRESHOLD_SIGNIFICANT,
            metric: DriftMetric::default(),
            min_reference_rows: DEFAULT_MIN_REFERENCE_ROWS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComparisonOperator {
    /// value > threshold is favorable
    Gt,
    /// value <= threshold is favorable
    Le,
}

impl ComparisonOperator {
    pub fn apply(&self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOperator::Gt => value > threshold,
            ComparisonOperator::Le => value <= threshold,
        }
    }
}

/// How a non-boolean outcome column is mapped to favorable / unfavorable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum OutcomeRule {
    PositiveLabel {
        label: String,
    },
    Threshold {
        value: f64,
        operator: ComparisonOperator,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessConfig {
    pub sensitive_column: String,
    pub outcome_column: String,

    #[serde(default)]
    pub outcome_rule: Option<OutcomeRule>,

    /// Explicit reference group. Defaults to the largest group.
    #[serde(default)]
    pub reference_group: Option<String>,

    #[serde(default = "default_min_group_size")]
    pub min_group_size: usize,
}

fn default_min_group_size() -> usize {
    DEFAULT_MIN_GROUP_SIZE
}

impl FairnessConfig {
    pub fn new(sensitive_column: impl Into<String>, outcome_column: impl Into<String>) -> Self {
        Self {
            sensitive_column: sensitive_column.into(),
            outcome_column: outcome_column.into(),
            outcome_rule: None,
            reference_group: None,
            min_group_size: DEFAULT_MIN_GROUP_SIZE,
        }
    }

    pub fn with_outcome_rule(mut self, rule: OutcomeRule) -> Self {
        self.outcome_rule = Some(rule);
        self
    }

    pub fn with_reference_group(mut self, group: impl Into<String>) -> Self {
        self.reference_group = Some(group.into());
        self
    }

    pub fn with_min_group_size(mut self, size: usize) -> Self {
        self.min_group_size = size;
        self
    }
}

/// Per-call computation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Columns to profile / compare. `None` selects every column.
    pub columns: Option<Vec<String>>,
    pub profile: ProfileConfig,
    pub drift: DriftConfig,
    pub fairness: Option<FairnessConfig>,
}

impl AnalyticsConfig {
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_fairness(mut self, fairness: FairnessConfig) -> Self {
        self.fairness = Some(fairness);
        self
    }

    /// Column selection in canonical form: sorted and de-duplicated.
    pub fn canonical_columns(&self) -> Option<Vec<String>> {
        self.columns.as_ref().map(|columns| {
            let mut columns = columns.clone();
            columns.sort();
            columns.dedup();
            columns
        })
    }

    /// The part of the configuration that influences a metric of `kind`.
    ///
    /// Object keys serialize sorted, so the value is a canonical form.
    pub fn section(&self, kind: MetricKind) -> Result<Value, TypeError> {
        let section = match kind {
            MetricKind::Profile => json!({
                "kind": kind.to_string(),
                "columns": self.canonical_columns(),
                "profile": serde_json::to_value(&self.profile)?,
            }),
            MetricKind::Drift => json!({
                "kind": kind.to_string(),
                "columns": self.canonical_columns(),
                "drift": serde_json::to_value(&self.drift)?,
            }),
            MetricKind::Fairness => {
                let fairness = self
                    .fairness
                    .as_ref()
                    .ok_or(TypeError::MissingFairnessConfig)?;
                json!({
                    "kind": kind.to_string(),
                    "fairness": serde_json::to_value(fairness)?,
                })
            }
        };
        Ok(section)
    }

    pub fn fingerprint(&self, kind: MetricKind) -> Result<ConfigFingerprint, TypeError> {
        ConfigFingerprint::compute(&self.section(kind)?)
    }
}
