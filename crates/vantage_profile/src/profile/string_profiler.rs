use itertools::Itertools;
use std::collections::HashMap;
use vantage_types::{
    CategoricalBias, CategoricalStats, CategoryFrequency, CharStats, Distinct, Severity, Statistic,
};

/// Cut-offs for the share of the most frequent category.
pub const MAJORITY_SHARE_THRESHOLDS: [f64; 3] = [0.6, 0.7, 0.9];

/// Cut-offs for the majority / minority count ratio.
pub const IMBALANCE_RATIO_THRESHOLDS: [f64; 3] = [3.0, 5.0, 10.0];

#[derive(Debug, Clone)]
struct LabelCount {
    count: usize,
    first_seen: usize,
}

/// Streaming state for a column profiled as categories: categorical, text
/// and boolean columns.
#[derive(Debug, Default, Clone)]
pub struct StringProfiler {
    counts: HashMap<String, LabelCount>,
    lengths: Vec<usize>,
    track_lengths: bool,
    null_count: usize,
    rows: usize,
}

impl StringProfiler {
    /// `track_lengths` enables character statistics, which are meaningless
    /// for booleans.
    pub fn new(track_lengths: bool) -> Self {
        StringProfiler {
            track_lengths,
            ..Default::default()
        }
    }

    pub fn update<S: AsRef<str>>(&mut self, batch: &[Option<S>]) {
        self.rows += batch.len();

        for value in batch {
            match value {
                Some(label) => self.observe(label.as_ref()),
                None => self.null_count += 1,
            }
        }
    }

    pub fn update_bool(&mut self, batch: &[Option<bool>]) {
        self.rows += batch.len();

        for value in batch {
            match value {
                Some(true) => self.observe("true"),
                Some(false) => self.observe("false"),
                None => self.null_count += 1,
            }
        }
    }

    fn observe(&mut self, label: &str) {
        let first_seen = self.counts.len();
        match self.counts.get_mut(label) {
            Some(entry) => entry.count += 1,
            None => {
                self.counts.insert(
                    label.to_string(),
                    LabelCount {
                        count: 1,
                        first_seen,
                    },
                );
            }
        }

        if self.track_lengths {
            self.lengths.push(label.chars().count());
        }
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    fn non_null(&self) -> usize {
        self.rows - self.null_count
    }

    /// Distinct labels, most frequent first; ties keep first-encountered order.
    fn ranked(&self) -> Vec<(&String, usize)> {
        self.counts
            .iter()
            .sorted_by(|(_, a), (_, b)| b.count.cmp(&a.count).then(a.first_seen.cmp(&b.first_seen)))
            .map(|(label, entry)| (label, entry.count))
            .collect()
    }

    pub fn distinct(&self) -> Distinct {
        let non_null = self.non_null();
        Distinct {
            count: self.counts.len(),
            percent: if non_null > 0 {
                (self.counts.len() as f64 / non_null as f64) * 100.0
            } else {
                0.0
            },
        }
    }

    pub fn finish(&mut self, top_k: usize) -> (CategoricalStats, Option<CharStats>) {
        let non_null = self.non_null();
        let ranked = self.ranked();

        let top_k = ranked
            .iter()
            .take(top_k)
            .map(|(label, count)| CategoryFrequency {
                value: (*label).clone(),
                count: *count,
                share: *count as f64 / non_null as f64,
            })
            .collect();

        let bias = self.compute_bias(&ranked);
        let stats = CategoricalStats {
            cardinality: self.counts.len(),
            top_k,
            bias,
        };

        (stats, self.char_stats())
    }

    fn compute_bias(&self, ranked: &[(&String, usize)]) -> Option<CategoricalBias> {
        let (majority_label, majority_count) = ranked.first()?;
        let minority_count = ranked.last().map(|(_, count)| *count)?;
        let non_null = self.non_null() as f64;

        let majority_share = *majority_count as f64 / non_null;
        let minority_share = minority_count as f64 / non_null;
        let imbalance_ratio = if minority_count > 0 {
            Statistic::from_f64(*majority_count as f64 / minority_count as f64)
        } else {
            Statistic::Undefined
        };

        let entropy = -ranked
            .iter()
            .map(|(_, count)| *count as f64 / non_null)
            .filter(|p| *p > 0.0)
            .map(|p| p * p.ln())
            .sum::<f64>();

        Some(CategoricalBias {
            majority_label: (*majority_label).clone(),
            majority_share,
            minority_share,
            imbalance_ratio,
            entropy,
            effective_categories: entropy.exp(),
            observed_categories: ranked.len(),
            missing_share: self.null_count as f64 / self.rows.max(1) as f64,
            majority_severity: Severity::rate(majority_share, MAJORITY_SHARE_THRESHOLDS),
            imbalance_severity: imbalance_ratio
                .value()
                .map(|ratio| Severity::rate(ratio, IMBALANCE_RATIO_THRESHOLDS))
                .unwrap_or(Severity::Ok),
        })
    }

    fn char_stats(&mut self) -> Option<CharStats> {
        if !self.track_lengths || self.lengths.is_empty() {
            return None;
        }
        self.lengths.sort_unstable();
        let lengths = &self.lengths;

        Some(CharStats {
            min_length: lengths[0],
            max_length: lengths[lengths.len() - 1],
            median_length: lengths[lengths.len() / 2],
            mean_length: lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn labels(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_top_k_ties_keep_first_seen_order() {
        let mut profiler = StringProfiler::new(true);
        profiler.update(&labels(&["b", "a", "c", "a", "b", "d"]));
        let (stats, _) = profiler.finish(3);

        let values: Vec<_> = stats.top_k.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values, vec!["b", "a", "c"]);
        assert_eq!(stats.cardinality, 4);
        assert_relative_eq!(stats.top_k[0].share, 2.0 / 6.0);
    }

    #[test]
    fn test_bias_indicators() {
        let mut values = vec![Some("yes".to_string()); 8];
        values.push(Some("no".to_string()));
        values.push(None);

        let mut profiler = StringProfiler::new(true);
        profiler.update(&values);
        let (stats, char_stats) = profiler.finish(10);
        let bias = stats.bias.unwrap();

        assert_eq!(bias.majority_label, "yes");
        assert_relative_eq!(bias.majority_share, 8.0 / 9.0);
        assert_relative_eq!(bias.minority_share, 1.0 / 9.0);
        assert_eq!(bias.imbalance_ratio, Statistic::Value(8.0));
        assert_eq!(bias.majority_severity, Severity::Mild);
        assert_eq!(bias.imbalance_severity, Severity::Mild);
        assert_relative_eq!(bias.missing_share, 0.1);

        let expected_entropy =
            -((8.0f64 / 9.0) * (8.0f64 / 9.0).ln() + (1.0f64 / 9.0) * (1.0f64 / 9.0).ln());
        assert_relative_eq!(bias.entropy, expected_entropy, epsilon = 1e-12);
        assert_relative_eq!(bias.effective_categories, expected_entropy.exp(), epsilon = 1e-12);

        let char_stats = char_stats.unwrap();
        assert_eq!(char_stats.min_length, 2);
        assert_eq!(char_stats.max_length, 3);
    }

    #[test]
    fn test_boolean_values() {
        let mut profiler = StringProfiler::new(false);
        profiler.update_bool(&[Some(true), Some(false), Some(true), None]);
        let (stats, char_stats) = profiler.finish(10);

        assert_eq!(stats.cardinality, 2);
        assert_eq!(stats.top_k[0].value, "true");
        assert!(char_stats.is_none());
    }

    #[test]
    fn test_all_null_has_no_bias() {
        let mut profiler = StringProfiler::new(true);
        profiler.update::<String>(&[None, None]);
        let (stats, char_stats) = profiler.finish(10);

        assert_eq!(stats.cardinality, 0);
        assert!(stats.top_k.is_empty());
        assert!(stats.bias.is_none());
        assert!(char_stats.is_none());
    }
}
