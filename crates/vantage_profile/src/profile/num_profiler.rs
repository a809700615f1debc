use crate::profile::moments::MomentAccumulator;
use std::collections::HashSet;
use vantage_types::{
    quantile_r7, sort_floats, Distinct, Histogram, NumericBias, NumericStats, Quantiles, Severity,
};

/// Cut-offs for the largest histogram bin share.
pub const BIN_SHARE_THRESHOLDS: [f64; 3] = [0.20, 0.25, 0.40];

/// Cut-offs for the share of values outside the IQR fences.
pub const OUTLIER_THRESHOLDS: [f64; 3] = [0.05, 0.10, 0.20];

const IQR_FENCE: f64 = 1.5;

/// Streaming state for one numeric column.
#[derive(Debug, Default, Clone)]
pub struct NumProfiler {
    moments: MomentAccumulator,
    values: Vec<f64>,
    distinct: HashSet<u64>,
    zero_count: usize,
    null_count: usize,
    rows: usize,
}

impl NumProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one batch of the column into the running state.
    pub fn update(&mut self, batch: &[Option<f64>]) {
        let mut batch_moments = MomentAccumulator::new();
        self.rows += batch.len();

        for value in batch {
            match value {
                Some(x) => {
                    batch_moments.update(*x);
                    self.values.push(*x);
                    // -0.0 and 0.0 are the same value
                    let canonical = if *x == 0.0 { 0.0f64 } else { *x };
                    self.distinct.insert(canonical.to_bits());
                    if *x == 0.0 {
                        self.zero_count += 1;
                    }
                }
                None => self.null_count += 1,
            }
        }

        self.moments.merge(&batch_moments);
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(mut self, histogram_bins: usize) -> NumericStats {
        sort_floats(&mut self.values);
        let non_null = self.values.len();

        let quantiles = compute_quantiles(&self.values);
        let histogram = compute_histogram(&self.values, histogram_bins);
        let bias = if non_null > 0 {
            Some(self.compute_bias(quantiles.as_ref(), histogram.as_ref()))
        } else {
            None
        };

        NumericStats {
            mean: self.moments.mean(),
            stddev: self.moments.stddev(),
            skewness: self.moments.skewness(),
            kurtosis: self.moments.kurtosis(),
            min: self.moments.min(),
            max: self.moments.max(),
            distinct: Distinct {
                count: self.distinct.len(),
                percent: if non_null > 0 {
                    (self.distinct.len() as f64 / non_null as f64) * 100.0
                } else {
                    0.0
                },
            },
            zero_count: self.zero_count,
            quantiles,
            histogram,
            bias,
        }
    }

    fn compute_bias(
        &self,
        quantiles: Option<&Quantiles>,
        histogram: Option<&Histogram>,
    ) -> NumericBias {
        let non_null = self.values.len() as f64;

        let max_bin_share = histogram
            .and_then(|h| h.bin_counts.iter().max().copied())
            .map(|max| max as f64 / non_null)
            .unwrap_or(0.0);

        // a zero IQR would flag every value off the median
        let outlier_fraction = match quantiles {
            Some(q) if q.q75 - q.q25 > 0.0 => {
                let iqr = q.q75 - q.q25;
                let lower = q.q25 - IQR_FENCE * iqr;
                let upper = q.q75 + IQR_FENCE * iqr;
                let outliers = self
                    .values
                    .iter()
                    .filter(|x| **x < lower || **x > upper)
                    .count();
                outliers as f64 / non_null
            }
            _ => 0.0,
        };

        let rows = self.rows.max(1) as f64;

        NumericBias {
            max_bin_share,
            bin_severity: Severity::rate(max_bin_share, BIN_SHARE_THRESHOLDS),
            outlier_fraction,
            outlier_severity: Severity::rate(outlier_fraction, OUTLIER_THRESHOLDS),
            zero_share: self.zero_count as f64 / rows,
            missing_share: self.null_count as f64 / rows,
        }
    }
}

/// Quartiles and 99th percentile of sorted values.
pub fn compute_quantiles(sorted: &[f64]) -> Option<Quantiles> {
    Some(Quantiles {
        q25: quantile_r7(sorted, 0.25)?,
        q50: quantile_r7(sorted, 0.50)?,
        q75: quantile_r7(sorted, 0.75)?,
        q99: quantile_r7(sorted, 0.99)?,
    })
}

/// Equal-width histogram between min and max of sorted values.
///
/// The maximum lands in the last bin. A constant column yields a single bin
/// of width zero.
pub fn compute_histogram(sorted: &[f64], num_bins: usize) -> Option<Histogram> {
    let (min, max) = (*sorted.first()?, *sorted.last()?);
    let num_bins = num_bins.max(1);

    if max == min {
        return Some(Histogram {
            bins: vec![min],
            bin_counts: vec![sorted.len()],
            bin_width: 0.0,
        });
    }

    let bin_width = (max - min) / num_bins as f64;
    let bins = (0..num_bins)
        .map(|i| min + bin_width * i as f64)
        .collect::<Vec<_>>();

    let mut bin_counts = vec![0; num_bins];
    for value in sorted {
        let index = (((value - min) / bin_width).floor() as usize).min(num_bins - 1);
        bin_counts[index] += 1;
    }

    Some(Histogram {
        bins,
        bin_counts,
        bin_width,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vantage_types::Statistic;

    #[test]
    fn test_numeric_stats_with_nulls() {
        let mut profiler = NumProfiler::new();
        profiler.update(&[Some(1.0), None, Some(2.0), Some(0.0)]);
        profiler.update(&[Some(3.0), None]);

        assert_eq!(profiler.null_count(), 2);
        assert_eq!(profiler.rows(), 6);

        let stats = profiler.finish(4);
        assert_eq!(stats.mean, Statistic::Value(1.5));
        assert_eq!(stats.min, Statistic::Value(0.0));
        assert_eq!(stats.max, Statistic::Value(3.0));
        assert_eq!(stats.zero_count, 1);
        assert_eq!(stats.distinct.count, 4);

        let bias = stats.bias.unwrap();
        assert_relative_eq!(bias.missing_share, 2.0 / 6.0);
        assert_relative_eq!(bias.zero_share, 1.0 / 6.0);
    }

    #[test]
    fn test_histogram_places_max_in_last_bin() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0];
        let histogram = compute_histogram(&values, 4).unwrap();

        assert_eq!(histogram.bin_counts, vec![1, 1, 1, 2]);
        assert_relative_eq!(histogram.bin_width, 1.0);
        assert_eq!(histogram.bins, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_constant_column() {
        let mut profiler = NumProfiler::new();
        profiler.update(&[Some(5.0); 5]);
        let stats = profiler.finish(10);

        assert_eq!(stats.stddev, Statistic::Value(0.0));
        assert!(stats.skewness.is_undefined());
        assert!(stats.kurtosis.is_undefined());

        let histogram = stats.histogram.unwrap();
        assert_eq!(histogram.bin_counts, vec![5]);

        let bias = stats.bias.unwrap();
        assert_eq!(bias.outlier_fraction, 0.0);
        assert_eq!(bias.outlier_severity, Severity::Ok);
        assert_eq!(bias.bin_severity, Severity::Severe);
    }

    #[test]
    fn test_outliers_flagged() {
        let mut values: Vec<Option<f64>> = (0..20).map(|i| Some(i as f64)).collect();
        values.push(Some(1000.0));
        values.push(Some(-1000.0));

        let mut profiler = NumProfiler::new();
        profiler.update(&values);
        let bias = profiler.finish(10).bias.unwrap();

        assert_relative_eq!(bias.outlier_fraction, 2.0 / 22.0);
        assert_eq!(bias.outlier_severity, Severity::Info);
    }

    #[test]
    fn test_all_null_column() {
        let mut profiler = NumProfiler::new();
        profiler.update(&[None, None, None]);
        let stats = profiler.finish(10);

        assert!(stats.mean.is_undefined());
        assert!(stats.stddev.is_undefined());
        assert!(stats.quantiles.is_none());
        assert!(stats.histogram.is_none());
        assert!(stats.bias.is_none());
    }
}
