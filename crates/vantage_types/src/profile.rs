use crate::dataset::ColumnKind;
use crate::statistic::Statistic;
use crate::util::RecordFuncs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::Display;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Distinct {
    pub count: usize,
    pub percent: f64,
}

/// Quantiles of the non-null values (R-7 interpolation).
///
/// # Arguments
///
/// * `q25` - The 25th percentile
/// * `q50` - The 50th percentile
/// * `q75` - The 75th percentile
/// * `q99` - The 99th percentile
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Quantiles {
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub q99: f64,
}

/// Equal-width histogram.
///
/// # Arguments
///
/// * `bins` - Lower edge of each bin
/// * `bin_counts` - Number of values in each bin
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Histogram {
    pub bins: Vec<f64>,
    pub bin_counts: Vec<usize>,
    pub bin_width: f64,
}

/// Four-level rating attached to bias indicators.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Ok,
    Info,
    Mild,
    Severe,
}

impl Severity {
    /// Rates `value` against ascending `[info, mild, severe]` cut-offs (inclusive).
    pub fn rate(value: f64, thresholds: [f64; 3]) -> Self {
        let [info, mild, severe] = thresholds;
        if value >= severe {
            Severity::Severe
        } else if value >= mild {
            Severity::Mild
        } else if value >= info {
            Severity::Info
        } else {
            Severity::Ok
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NumericBias {
    /// Largest share of non-null values falling in one histogram bin.
    pub max_bin_share: f64,
    pub bin_severity: Severity,

    /// Share of non-null values outside the 1.5 x IQR fences.
    pub outlier_fraction: f64,
    pub outlier_severity: Severity,

    /// Shares over all rows, nulls included.
    pub zero_share: f64,
    pub missing_share: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NumericStats {
    pub mean: Statistic,
    pub stddev: Statistic,
    pub skewness: Statistic,

    /// Excess kurtosis (fourth standardized moment minus 3).
    pub kurtosis: Statistic,

    pub min: Statistic,
    pub max: Statistic,
    pub distinct: Distinct,
    pub zero_count: usize,
    pub quantiles: Option<Quantiles>,
    pub histogram: Option<Histogram>,
    pub bias: Option<NumericBias>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CategoryFrequency {
    pub value: String,
    pub count: usize,
    pub share: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CategoricalBias {
    pub majority_label: String,
    pub majority_share: f64,
    pub minority_share: f64,
    pub imbalance_ratio: Statistic,

    /// Shannon entropy of the category shares, natural log.
    pub entropy: f64,
    pub effective_categories: f64,
    pub observed_categories: usize,
    pub missing_share: f64,
    pub majority_severity: Severity,
    pub imbalance_severity: Severity,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CategoricalStats {
    pub cardinality: usize,

    /// Most frequent values; ties keep first-encountered order.
    pub top_k: Vec<CategoryFrequency>,
    pub bias: Option<CategoricalBias>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CharStats {
    pub min_length: usize,
    pub max_length: usize,
    pub median_length: usize,
    pub mean_length: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DatetimeStats {
    pub min: Option<DateTime<Utc>>,
    pub max: Option<DateTime<Utc>>,
    pub span_seconds: Statistic,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,

    /// Total rows, nulls included.
    pub count: usize,
    pub null_count: usize,
    pub non_null_count: usize,

    pub numeric_stats: Option<NumericStats>,
    pub categorical_stats: Option<CategoricalStats>,
    pub char_stats: Option<CharStats>,
    pub datetime_stats: Option<DatetimeStats>,
}

pub type CorrelationMatrix = BTreeMap<String, BTreeMap<String, Statistic>>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DataProfile {
    pub row_count: usize,
    pub columns: BTreeMap<String, ColumnProfile>,
    pub correlations: Option<CorrelationMatrix>,
}

impl DataProfile {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.get(name)
    }

    pub fn pretty_json(&self) -> String {
        RecordFuncs::pretty_json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_rate() {
        let cutoffs = [0.20, 0.25, 0.40];

        assert_eq!(Severity::rate(0.1, cutoffs), Severity::Ok);
        assert_eq!(Severity::rate(0.2, cutoffs), Severity::Info);
        assert_eq!(Severity::rate(0.3, cutoffs), Severity::Mild);
        assert_eq!(Severity::rate(0.4, cutoffs), Severity::Severe);
    }
}
