use crate::binning::BinningStrategy;
use crate::error::DriftError;
use crate::psi::{compute_kl, compute_psi};
use ndarray::ArrayView1;
use rayon::prelude::*;
use std::collections::HashMap;
use vantage_types::{Bin, BinType, DriftConfig, DriftMetric, DriftResult, DriftTier};

/// Non-null values of one side of a column, with the null count kept aside.
#[derive(Debug, Clone)]
pub struct CleanColumn<T> {
    pub values: Vec<T>,
    pub nulls: usize,
}

impl<T> CleanColumn<T> {
    pub fn from_options(values: Vec<Option<T>>) -> Self {
        let total = values.len();
        let values = values.into_iter().flatten().collect::<Vec<_>>();
        Self {
            nulls: total - values.len(),
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Column-level drift: bin construction and divergence.
#[derive(Default)]
pub struct DriftMonitor {}

impl DriftMonitor {
    pub fn new() -> Self {
        DriftMonitor {}
    }

    /// Values in `(lower, upper]`; a missing limit is unbounded.
    fn compute_bin_count(values: &[f64], lower: Option<f64>, upper: Option<f64>) -> usize {
        values
            .iter()
            .filter(|&&value| {
                lower.map_or(true, |l| value > l) && upper.map_or(true, |u| value <= u)
            })
            .count()
    }

    fn proportion(count: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    }

    /// Bins from reference edges. The outer bins are open-ended, so current
    /// values beyond the reference range land in the boundary bins.
    pub fn create_numeric_bins(
        &self,
        reference: &[f64],
        current: &[f64],
        config: &DriftConfig,
    ) -> Result<Vec<Bin>, DriftError> {
        let edges = BinningStrategy::from_config(config)
            .compute_edges(&ArrayView1::from(reference))?;

        let bins = (0..=edges.len())
            .into_par_iter()
            .map(|index| {
                let lower = (index > 0).then(|| edges[index - 1]);
                let upper = (index < edges.len()).then(|| edges[index]);

                let ref_count = Self::compute_bin_count(reference, lower, upper);
                let cur_count = Self::compute_bin_count(current, lower, upper);

                Bin {
                    id: index + 1,
                    label: None,
                    lower_limit: lower,
                    upper_limit: upper,
                    reference_proportion: Self::proportion(ref_count, reference.len()),
                    current_proportion: Self::proportion(cur_count, current.len()),
                }
            })
            .collect();

        Ok(bins)
    }

    /// One bin per category over the union of both sides: reference
    /// categories in first-seen order, then categories only seen in current.
    pub fn create_categorical_bins(&self, reference: &[String], current: &[String]) -> Vec<Bin> {
        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

        for label in reference {
            let entry = counts.entry(label.as_str()).or_insert_with(|| {
                order.push(label.as_str());
                (0, 0)
            });
            entry.0 += 1;
        }
        for label in current {
            let entry = counts.entry(label.as_str()).or_insert_with(|| {
                order.push(label.as_str());
                (0, 0)
            });
            entry.1 += 1;
        }

        order
            .into_iter()
            .enumerate()
            .map(|(index, label)| {
                let (ref_count, cur_count) = counts.get(label).copied().unwrap_or((0, 0));
                Bin {
                    id: index + 1,
                    label: Some(label.to_string()),
                    lower_limit: None,
                    upper_limit: None,
                    reference_proportion: Self::proportion(ref_count, reference.len()),
                    current_proportion: Self::proportion(cur_count, current.len()),
                }
            })
            .collect()
    }

    /// Score bins and classify the column.
    pub fn score(
        &self,
        bins: Vec<Bin>,
        bin_type: BinType,
        counts: ColumnCounts,
        config: &DriftConfig,
    ) -> DriftResult {
        let pairs = bins
            .iter()
            .map(|bin| (bin.reference_proportion, bin.current_proportion))
            .collect::<Vec<_>>();

        let psi = compute_psi(&pairs, config.smoothing_epsilon);
        let kl = compute_kl(&pairs, config.smoothing_epsilon);

        let chosen = match config.metric {
            DriftMetric::Psi => psi,
            DriftMetric::Kl => kl,
        };
        let tier = DriftTier::classify(
            chosen,
            config.drift_threshold_moderate,
            config.drift_threshold_significant,
        );

        DriftResult {
            bin_type,
            psi,
            kl,
            tier,
            drifted: tier == DriftTier::Significant,
            bins,
            reference_count: counts.reference_count,
            current_count: counts.current_count,
            reference_nulls: counts.reference_nulls,
            current_nulls: counts.current_nulls,
        }
    }

    pub fn compute_numeric_drift(
        &self,
        reference: &CleanColumn<f64>,
        current: &CleanColumn<f64>,
        config: &DriftConfig,
    ) -> Result<DriftResult, DriftError> {
        let bins = self.create_numeric_bins(&reference.values, &current.values, config)?;
        Ok(self.score(
            bins,
            BinType::Numeric,
            ColumnCounts::of(reference, current),
            config,
        ))
    }

    pub fn compute_categorical_drift(
        &self,
        reference: &CleanColumn<String>,
        current: &CleanColumn<String>,
        config: &DriftConfig,
    ) -> DriftResult {
        let bins = self.create_categorical_bins(&reference.values, &current.values);
        self.score(
            bins,
            BinType::Category,
            ColumnCounts::of(reference, current),
            config,
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnCounts {
    pub reference_count: usize,
    pub current_count: usize,
    pub reference_nulls: usize,
    pub current_nulls: usize,
}

impl ColumnCounts {
    pub fn of<T>(reference: &CleanColumn<T>, current: &CleanColumn<T>) -> Self {
        Self {
            reference_count: reference.values.len(),
            current_count: current.values.len(),
            reference_nulls: reference.nulls,
            current_nulls: current.nulls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn numbers(values: &[f64]) -> CleanColumn<f64> {
        CleanColumn::from_options(values.iter().copied().map(Some).collect())
    }

    fn labels(values: &[&str]) -> CleanColumn<String> {
        CleanColumn::from_options(values.iter().map(|v| Some(v.to_string())).collect())
    }

    #[test]
    fn test_identical_numeric_is_stable() {
        let values = numbers(&[1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0]);
        let result = DriftMonitor::new()
            .compute_numeric_drift(&values, &values.clone(), &DriftConfig::default())
            .unwrap();

        assert_eq!(result.psi, 0.0);
        assert_eq!(result.tier, DriftTier::Stable);
        assert!(!result.drifted);

        let total: f64 = result.bins.iter().map(|b| b.reference_proportion).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_range_values_clip_into_boundary_bins() {
        let reference = numbers(&(0..100).map(|x| x as f64).collect::<Vec<_>>());
        let current = numbers(&[-50.0, 500.0, 1000.0]);

        let bins = DriftMonitor::new()
            .create_numeric_bins(&reference.values, &current.values, &DriftConfig::default())
            .unwrap();

        let first = bins.first().unwrap();
        let last = bins.last().unwrap();
        assert!(first.lower_limit.is_none());
        assert!(last.upper_limit.is_none());
        assert_relative_eq!(first.current_proportion, 1.0 / 3.0);
        assert_relative_eq!(last.current_proportion, 2.0 / 3.0);

        let total: f64 = bins.iter().map(|b| b.current_proportion).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_category_union_order() {
        let bins = DriftMonitor::new().create_categorical_bins(
            &["b".to_string(), "a".to_string(), "b".to_string()],
            &["c".to_string(), "a".to_string()],
        );

        let order: Vec<_> = bins.iter().map(|b| b.label.clone().unwrap()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert_relative_eq!(bins[0].reference_proportion, 2.0 / 3.0);
        assert_eq!(bins[2].reference_proportion, 0.0);
        assert_relative_eq!(bins[2].current_proportion, 0.5);
    }

    #[test]
    fn test_disjoint_categories_are_significant() {
        let reference = labels(&["A"; 100]);
        let current = labels(&["B"; 100]);
        let config = DriftConfig::default();

        let result = DriftMonitor::new().compute_categorical_drift(&reference, &current, &config);
        let eps = config.smoothing_epsilon;

        assert_relative_eq!(
            result.psi,
            2.0 * (1.0 - eps) * (1.0 / eps).ln(),
            epsilon = 1e-9
        );
        assert_eq!(result.tier, DriftTier::Significant);
        assert!(result.drifted);
    }

    #[test]
    fn test_kl_metric_drives_tier() {
        let reference = labels(&["a", "a", "a", "b"]);
        let current = labels(&["a", "b", "b", "b"]);
        let config = DriftConfig {
            metric: DriftMetric::Kl,
            drift_threshold_moderate: 10.0,
            drift_threshold_significant: 20.0,
            ..Default::default()
        };

        let result = DriftMonitor::new().compute_categorical_drift(&reference, &current, &config);

        assert!(result.psi > 0.1);
        assert_eq!(result.tier, DriftTier::Stable);
    }

    #[test]
    fn test_nulls_counted_separately() {
        let reference = CleanColumn::from_options(vec![Some(1.0), None, Some(2.0)]);

        assert_eq!(reference.values, vec![1.0, 2.0]);
        assert_eq!(reference.nulls, 1);
    }
}
