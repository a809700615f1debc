use crate::error::DriftError;
use ndarray::ArrayView1;
use vantage_types::{quantile_r7, sort_floats};

pub struct QuantileBinning {
    pub num_quantiles: usize,
}

impl QuantileBinning {
    /// Computes interior quantile edges for binning using the R-7 method
    /// (Hyndman & Fan Type 7).
    ///
    /// Edge `i` is the `i / num_quantiles` quantile for `i` in `1..num_quantiles`.
    /// Repeated values can produce identical edges; those are collapsed, so
    /// heavily tied data yields fewer bins than requested.
    ///
    /// # Arguments
    /// * `arr` - Reference values, any order, all finite
    ///
    /// # Returns
    /// * `Ok(Vec<f64>)` - Strictly increasing interior edges
    /// * `Err(DriftError)` - If the array is empty or fewer than two quantiles are requested
    pub fn compute_edges(&self, arr: &ArrayView1<f64>) -> Result<Vec<f64>, DriftError> {
        if self.num_quantiles < 2 {
            return Err(DriftError::InvalidParameterError(
                "num_quantiles must be at least 2".to_string(),
            ));
        }

        if arr.is_empty() {
            return Err(DriftError::InsufficientDataError(
                "Need at least 1 data point for quantile binning".to_string(),
            ));
        }

        let mut data: Vec<f64> = arr.to_vec();
        sort_floats(&mut data);

        let mut edges = (1..self.num_quantiles)
            .filter_map(|i| quantile_r7(&data, i as f64 / self.num_quantiles as f64))
            .collect::<Vec<_>>();
        edges.dedup();

        Ok(edges)
    }
}
