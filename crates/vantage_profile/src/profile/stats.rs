use crate::error::DataProfileError;
use ndarray::prelude::*;
use ndarray_stats::CorrelationExt;
use num_traits::{Float, FromPrimitive};
use std::collections::BTreeMap;
use vantage_types::{ColumnSlice, CorrelationMatrix, DatasetBatch, Statistic};

/// Collects rows where every tracked numeric column is non-null.
#[derive(Debug, Clone)]
pub struct CorrelationAccumulator {
    columns: Vec<String>,
    values: Vec<f64>,
    rows: usize,
}

impl CorrelationAccumulator {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            values: Vec::new(),
            rows: 0,
        }
    }

    pub fn update(&mut self, batch: &DatasetBatch<'_>) {
        let slices = self
            .columns
            .iter()
            .filter_map(|name| match batch.column(name) {
                Some(ColumnSlice::Numeric(values)) => Some(values),
                _ => None,
            })
            .collect::<Vec<_>>();

        if slices.len() != self.columns.len() {
            return;
        }

        for row in 0..batch.rows {
            let complete = slices.iter().all(|values| values[row].is_some());
            if complete {
                self.values
                    .extend(slices.iter().filter_map(|values| values[row]));
                self.rows += 1;
            }
        }
    }

    /// Pearson matrix over the complete rows. `None` when fewer than two
    /// columns or rows are available.
    pub fn finish(self) -> Result<Option<CorrelationMatrix>, DataProfileError> {
        if self.columns.len() < 2 || self.rows < 2 {
            return Ok(None);
        }
        let data = Array2::from_shape_vec((self.rows, self.columns.len()), self.values)?;
        let correlations = compute_feature_correlations(&data.view(), &self.columns)?;

        Ok(Some(correlations))
    }
}

// compute_feature_correlations computes the correlation between features in a 2D array
//
// # Arguments
//
// * `data` - A 2D array of data, one column per feature
// * `features` - A vector of feature names
//
// # Returns
//
// Feature name to other feature names to correlation. A constant feature
// yields undefined correlations.
pub fn compute_feature_correlations<F>(
    data: &ArrayView2<F>,
    features: &[String],
) -> Result<CorrelationMatrix, DataProfileError>
where
    F: Float + FromPrimitive + 'static,
{
    let mut feature_correlations: CorrelationMatrix = BTreeMap::new();
    let correlations = data.t().pearson_correlation()?;

    features.iter().enumerate().for_each(|(i, feature)| {
        let feature_correlation = features
            .iter()
            .enumerate()
            .filter(|(j, _)| i != *j)
            .map(|(j, other_feature)| {
                let value = correlations[[i, j]]
                    .to_f64()
                    .map(Statistic::from_f64)
                    .unwrap_or(Statistic::Undefined);
                (other_feature.clone(), value)
            })
            .collect();
        feature_correlations.insert(feature.clone(), feature_correlation);
    });

    Ok(feature_correlations)
}
