use crate::binning::equal_width::EqualWidthBinning;
use crate::binning::quantile::QuantileBinning;
use crate::error::DriftError;
use ndarray::ArrayView1;
use vantage_types::{BinningMethod, DriftConfig};

pub enum BinningStrategy {
    QuantileBinning(QuantileBinning),
    EqualWidthBinning(EqualWidthBinning),
}

impl BinningStrategy {
    pub fn from_config(config: &DriftConfig) -> Self {
        match config.binning {
            BinningMethod::Quantile => BinningStrategy::QuantileBinning(QuantileBinning {
                num_quantiles: config.bin_count,
            }),
            BinningMethod::EqualWidth => BinningStrategy::EqualWidthBinning(EqualWidthBinning {
                num_bins: config.bin_count,
            }),
        }
    }

    pub fn compute_edges(&self, arr: &ArrayView1<f64>) -> Result<Vec<f64>, DriftError> {
        if arr.iter().any(|x| !x.is_finite()) {
            return Err(DriftError::InvalidValueError(
                "nan or infinity values detected in reference data, unable to compute bin edges."
                    .to_string(),
            ));
        }

        match self {
            BinningStrategy::QuantileBinning(b) => b.compute_edges(arr),
            BinningStrategy::EqualWidthBinning(b) => b.compute_edges(arr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_rejects_non_finite() {
        let array = Array1::from(vec![1.0, f64::NAN]);
        let strategy = BinningStrategy::from_config(&DriftConfig::default());

        assert!(matches!(
            strategy.compute_edges(&array.view()),
            Err(DriftError::InvalidValueError(_))
        ));
    }

    #[test]
    fn test_strategy_follows_config() {
        let config = DriftConfig {
            binning: BinningMethod::EqualWidth,
            bin_count: 4,
            ..Default::default()
        };
        let array = Array1::from(vec![0.0, 4.0]);
        let edges = BinningStrategy::from_config(&config)
            .compute_edges(&array.view())
            .unwrap();

        assert_eq!(edges, vec![1.0, 2.0, 3.0]);
    }
}
