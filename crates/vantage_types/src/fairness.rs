use crate::statistic::Statistic;
use crate::util::RecordFuncs;
use serde::{Deserialize, Serialize};

/// Outcome metrics for one value of the sensitive attribute.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GroupFairness {
    pub group: String,
    pub group_size: usize,
    pub favorable_count: usize,
    pub selection_rate: f64,

    /// group rate / reference rate; undefined when the reference rate is zero.
    pub disparate_impact: Statistic,

    /// group rate - reference rate.
    pub statistical_parity_difference: f64,

    /// Set when the group is smaller than the configured minimum.
    pub low_confidence: bool,
    pub is_reference: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FairnessReport {
    pub sensitive_column: String,
    pub outcome_column: String,
    pub reference_group: String,
    pub reference_selection_rate: f64,
    pub overall_selection_rate: f64,

    /// max group selection rate - min group selection rate.
    pub demographic_parity_difference: f64,

    /// Rows dropped for a null sensitive value or a null outcome.
    pub excluded_rows: usize,

    /// Groups in first-encountered order.
    pub groups: Vec<GroupFairness>,
}

impl FairnessReport {
    pub fn group(&self, name: &str) -> Option<&GroupFairness> {
        self.groups.iter().find(|g| g.group == name)
    }

    pub fn low_confidence_groups(&self) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|g| g.low_confidence)
            .map(|g| g.group.as_str())
            .collect()
    }

    pub fn pretty_json(&self) -> String {
        RecordFuncs::pretty_json(self)
    }
}
