use crate::error::DriftError;
use ndarray::ArrayView1;
use ndarray_stats::QuantileExt;

pub struct EqualWidthBinning {
    pub num_bins: usize,
}

impl EqualWidthBinning {
    /// Interior edges splitting `[min, max]` of the reference into `num_bins`
    /// equally wide bins. A constant reference collapses to a single edge.
    pub fn compute_edges(&self, arr: &ArrayView1<f64>) -> Result<Vec<f64>, DriftError> {
        if self.num_bins < 2 {
            return Err(DriftError::InvalidParameterError(format!(
                "Equal width binning needs at least 2 bins, got {}",
                self.num_bins
            )));
        }

        let min_val = *arr.min()?;
        let max_val = *arr.max()?;

        let range = max_val - min_val;
        let bin_width = range / self.num_bins as f64;

        let mut edges = (1..self.num_bins)
            .map(|i| min_val + bin_width * i as f64)
            .collect::<Vec<_>>();
        edges.dedup();

        Ok(edges)
    }
}
