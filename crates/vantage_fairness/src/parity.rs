use crate::error::FairnessError;
use crate::outcome::{binarize_outcome, group_labels};
use std::collections::HashMap;
use tracing::{debug, instrument};
use vantage_types::{Dataset, FairnessConfig, FairnessReport, GroupFairness, Statistic};

#[derive(Debug, Clone)]
struct GroupCounts {
    label: String,
    size: usize,
    favorable: usize,
}

impl GroupCounts {
    fn selection_rate(&self) -> f64 {
        self.favorable as f64 / self.size as f64
    }
}

/// Selection-rate parity across the groups of a sensitive attribute.
#[derive(Debug, Default, Clone)]
pub struct FairnessAnalyzer {}

impl FairnessAnalyzer {
    pub fn new() -> Self {
        FairnessAnalyzer {}
    }

    /// Groups in first-encountered order plus the number of excluded rows.
    fn tally(groups: &[Option<String>], outcomes: &[Option<bool>]) -> (Vec<GroupCounts>, usize) {
        let mut counts: Vec<GroupCounts> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut excluded = 0;

        for (group, outcome) in groups.iter().zip(outcomes) {
            let (Some(group), Some(outcome)) = (group, outcome) else {
                excluded += 1;
                continue;
            };

            let position = *index.entry(group.as_str()).or_insert_with(|| {
                counts.push(GroupCounts {
                    label: group.clone(),
                    size: 0,
                    favorable: 0,
                });
                counts.len() - 1
            });

            let entry = &mut counts[position];
            entry.size += 1;
            if *outcome {
                entry.favorable += 1;
            }
        }

        (counts, excluded)
    }

    /// Explicit reference group, or the largest group (ties to the first seen).
    fn reference_index(
        counts: &[GroupCounts],
        explicit: Option<&str>,
    ) -> Result<usize, FairnessError> {
        match explicit {
            Some(name) => counts
                .iter()
                .position(|g| g.label == name)
                .ok_or_else(|| FairnessError::ReferenceGroupNotFound(name.to_string())),
            None => {
                let mut best = 0;
                for (i, group) in counts.iter().enumerate() {
                    if group.size > counts[best].size {
                        best = i;
                    }
                }
                Ok(best)
            }
        }
    }

    /// Compute per-group selection rates and ratios against the reference group.
    ///
    /// # Arguments
    ///
    /// * `dataset` - Dataset holding the sensitive and outcome columns
    /// * `config` - Column names, outcome rule, reference group and the
    ///   low-confidence group size
    ///
    /// # Returns
    ///
    /// * `FairnessReport` - One entry per group. Small groups are flagged, not dropped.
    #[instrument(
        skip_all,
        fields(sensitive = %config.sensitive_column, outcome = %config.outcome_column)
    )]
    pub fn compute(
        &self,
        dataset: &Dataset,
        config: &FairnessConfig,
    ) -> Result<FairnessReport, FairnessError> {
        let sensitive = dataset
            .column(&config.sensitive_column)
            .ok_or_else(|| FairnessError::ColumnNotFound(config.sensitive_column.clone()))?;
        let outcome = dataset
            .column(&config.outcome_column)
            .ok_or_else(|| FairnessError::ColumnNotFound(config.outcome_column.clone()))?;

        let outcomes = binarize_outcome(outcome, config.outcome_rule.as_ref())?;
        let groups = group_labels(sensitive);

        let (counts, excluded_rows) = Self::tally(&groups, &outcomes);
        if counts.is_empty() {
            return Err(FairnessError::NoRows);
        }

        let reference = Self::reference_index(&counts, config.reference_group.as_deref())?;
        let reference_rate = counts[reference].selection_rate();

        let usable: usize = counts.iter().map(|g| g.size).sum();
        let favorable: usize = counts.iter().map(|g| g.favorable).sum();

        let group_results = counts
            .iter()
            .enumerate()
            .map(|(i, group)| {
                let rate = group.selection_rate();
                let disparate_impact = if reference_rate == 0.0 {
                    Statistic::Undefined
                } else {
                    Statistic::from_f64(rate / reference_rate)
                };

                GroupFairness {
                    group: group.label.clone(),
                    group_size: group.size,
                    favorable_count: group.favorable,
                    selection_rate: rate,
                    disparate_impact,
                    statistical_parity_difference: rate - reference_rate,
                    low_confidence: group.size < config.min_group_size,
                    is_reference: i == reference,
                }
            })
            .collect::<Vec<_>>();

        let (min_rate, max_rate) = group_results.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), g| (lo.min(g.selection_rate), hi.max(g.selection_rate)),
        );

        debug!(
            groups = group_results.len(),
            excluded_rows,
            reference = %counts[reference].label,
            "Computed fairness report"
        );

        Ok(FairnessReport {
            sensitive_column: config.sensitive_column.clone(),
            outcome_column: config.outcome_column.clone(),
            reference_group: counts[reference].label.clone(),
            reference_selection_rate: reference_rate,
            overall_selection_rate: favorable as f64 / usable as f64,
            demographic_parity_difference: max_rate - min_rate,
            excluded_rows,
            groups: group_results,
        })
    }
}
