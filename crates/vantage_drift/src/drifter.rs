use crate::error::DriftError;
use crate::psi::{CleanColumn, DriftMonitor};
use itertools::Itertools;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};
use vantage_types::{Column, ColumnDrift, Dataset, DriftConfig, DriftReport, SkipReason};

/// Dataset-level drift between a reference and a current dataset.
#[derive(Default)]
pub struct Drifter {
    monitor: DriftMonitor,
}

impl Drifter {
    pub fn new() -> Self {
        Self {
            monitor: DriftMonitor::new(),
        }
    }

    /// Columns to compare: the selection when given, otherwise reference
    /// columns followed by columns only present in current.
    fn column_names(
        reference: &Dataset,
        current: &Dataset,
        columns: Option<&[String]>,
    ) -> Vec<String> {
        match columns {
            Some(names) => names.iter().unique().cloned().collect(),
            None => reference
                .column_names()
                .into_iter()
                .chain(current.column_names())
                .unique()
                .map(str::to_string)
                .collect(),
        }
    }

    fn compute_column(
        &self,
        reference: Option<&Column>,
        current: Option<&Column>,
        config: &DriftConfig,
    ) -> Result<ColumnDrift, DriftError> {
        let (reference, current) = match (reference, current) {
            (None, _) => {
                return Ok(ColumnDrift::Skipped {
                    reason: SkipReason::MissingInReference,
                })
            }
            (_, None) => {
                return Ok(ColumnDrift::Skipped {
                    reason: SkipReason::MissingInCurrent,
                })
            }
            (Some(r), Some(c)) => (r, c),
        };

        if reference.kind() != current.kind() {
            return Ok(ColumnDrift::Skipped {
                reason: SkipReason::KindMismatch {
                    reference: reference.kind(),
                    current: current.kind(),
                },
            });
        }

        if let (Some(ref_values), Some(cur_values)) = (
            reference.data().numeric_axis(),
            current.data().numeric_axis(),
        ) {
            let ref_values = CleanColumn::from_options(ref_values);
            let cur_values = CleanColumn::from_options(cur_values);
            if let Some(skipped) = Self::check_empty(&ref_values, &cur_values) {
                return Ok(skipped);
            }
            let result = self
                .monitor
                .compute_numeric_drift(&ref_values, &cur_values, config)?;
            return Ok(ColumnDrift::Computed(result));
        }

        if let (Some(ref_labels), Some(cur_labels)) =
            (reference.data().labels(), current.data().labels())
        {
            let ref_labels = CleanColumn::from_options(ref_labels);
            let cur_labels = CleanColumn::from_options(cur_labels);
            if let Some(skipped) = Self::check_empty(&ref_labels, &cur_labels) {
                return Ok(skipped);
            }
            let result = self
                .monitor
                .compute_categorical_drift(&ref_labels, &cur_labels, config);
            return Ok(ColumnDrift::Computed(result));
        }

        // same kind on both sides always resolves to one of the axes above
        Ok(ColumnDrift::Skipped {
            reason: SkipReason::KindMismatch {
                reference: reference.kind(),
                current: current.kind(),
            },
        })
    }

    fn check_empty<T>(reference: &CleanColumn<T>, current: &CleanColumn<T>) -> Option<ColumnDrift> {
        if reference.is_empty() {
            Some(ColumnDrift::Skipped {
                reason: SkipReason::EmptyReference,
            })
        } else if current.is_empty() {
            Some(ColumnDrift::Skipped {
                reason: SkipReason::EmptyCurrent,
            })
        } else {
            None
        }
    }

    /// Compare `current` against `reference`, column by column.
    ///
    /// Incompatible columns are skipped with a reason rather than failing the
    /// report. Only a reference below `min_reference_rows` or an empty
    /// current dataset is fatal.
    #[instrument(
        skip_all,
        fields(
            reference_rows = reference.row_count(),
            current_rows = current.row_count()
        )
    )]
    pub fn compute_drift(
        &self,
        reference: &Dataset,
        current: &Dataset,
        columns: Option<&[String]>,
        config: &DriftConfig,
    ) -> Result<DriftReport, DriftError> {
        if reference.row_count() < config.min_reference_rows {
            return Err(DriftError::ReferenceTooSmall {
                rows: reference.row_count(),
                required: config.min_reference_rows,
            });
        }

        if current.row_count() == 0 {
            return Err(DriftError::EmptyCurrent);
        }

        let names = Self::column_names(reference, current, columns);

        let results = names
            .par_iter()
            .map(|name| {
                let drift =
                    self.compute_column(reference.column(name), current.column(name), config)?;
                Ok((name.clone(), drift))
            })
            .collect::<Result<Vec<_>, DriftError>>()?;

        let columns: BTreeMap<String, ColumnDrift> = results.into_iter().collect();

        let skipped = columns
            .iter()
            .filter_map(|(name, drift)| drift.skip_reason().map(|r| (name, r)))
            .collect::<Vec<_>>();
        if !skipped.is_empty() {
            warn!(count = skipped.len(), "Skipped incompatible columns: {:?}", skipped);
        }

        let report = DriftReport {
            reference_rows: reference.row_count(),
            current_rows: current.row_count(),
            metric: config.metric,
            columns,
        };

        debug!(drifted = ?report.drifted_columns(), "Computed drift report");

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};
    use vantage_types::{BinType, DriftTier};

    fn scenario_a() -> Dataset {
        Dataset::new(vec![Column::numeric_values(
            "x",
            vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0],
        )])
        .unwrap()
    }

    #[test]
    fn test_identical_datasets_are_stable() {
        let reference = scenario_a();
        let current = scenario_a();

        let report = Drifter::new()
            .compute_drift(&reference, &current, None, &DriftConfig::default())
            .unwrap();
        let result = report.column("x").unwrap().result().unwrap();

        assert_eq!(result.psi, 0.0);
        assert_eq!(result.tier, DriftTier::Stable);
        assert!(report.drifted_columns().is_empty());
    }

    #[test]
    fn test_disjoint_categories_are_significant() {
        let reference =
            Dataset::new(vec![Column::categorical_values("c", vec!["A"; 100])]).unwrap();
        let current =
            Dataset::new(vec![Column::categorical_values("c", vec!["B"; 100])]).unwrap();
        let config = DriftConfig::default();

        let report = Drifter::new()
            .compute_drift(&reference, &current, None, &config)
            .unwrap();
        let result = report.column("c").unwrap().result().unwrap();
        let eps = config.smoothing_epsilon;

        assert_eq!(result.bin_type, BinType::Category);
        assert_relative_eq!(
            result.psi,
            2.0 * (1.0 - eps) * (1.0 / eps).ln(),
            epsilon = 1e-9
        );
        assert_eq!(result.tier, DriftTier::Significant);
        assert_eq!(report.drifted_columns(), vec!["c"]);
    }

    #[test]
    fn test_incompatible_columns_are_skipped() {
        let reference = Dataset::new(vec![
            Column::numeric_values("shared", (0..20).map(|x| x as f64)),
            Column::numeric_values("kind", (0..20).map(|x| x as f64)),
            Column::numeric_values("only_ref", (0..20).map(|x| x as f64)),
            Column::numeric("empty_ref", vec![None; 20]),
        ])
        .unwrap();
        let current = Dataset::new(vec![
            Column::numeric_values("shared", (0..20).map(|x| x as f64)),
            Column::text("kind", (0..20).map(|x| Some(x.to_string()))),
            Column::boolean_values("only_cur", vec![true; 20]),
            Column::numeric_values("empty_ref", vec![1.0; 20]),
        ])
        .unwrap();

        let report = Drifter::new()
            .compute_drift(&reference, &current, None, &DriftConfig::default())
            .unwrap();

        assert!(report.column("shared").unwrap().result().is_some());
        assert!(matches!(
            report.column("kind").unwrap().skip_reason(),
            Some(SkipReason::KindMismatch { .. })
        ));
        assert_eq!(
            report.column("only_ref").unwrap().skip_reason(),
            Some(&SkipReason::MissingInCurrent)
        );
        assert_eq!(
            report.column("only_cur").unwrap().skip_reason(),
            Some(&SkipReason::MissingInReference)
        );
        assert_eq!(
            report.column("empty_ref").unwrap().skip_reason(),
            Some(&SkipReason::EmptyReference)
        );
    }

    #[test]
    fn test_reference_too_small() {
        let reference = Dataset::new(vec![Column::numeric_values("x", vec![1.0, 2.0])]).unwrap();

        let result = Drifter::new().compute_drift(
            &reference,
            &scenario_a(),
            None,
            &DriftConfig::default(),
        );

        assert!(matches!(
            result,
            Err(DriftError::ReferenceTooSmall { rows: 2, required: 10 })
        ));
    }

    #[test]
    fn test_empty_current_is_fatal() {
        let current =
            Dataset::new(vec![Column::numeric_values("x", Vec::<f64>::new())]).unwrap();

        let result =
            Drifter::new().compute_drift(&scenario_a(), &current, None, &DriftConfig::default());

        assert!(matches!(result, Err(DriftError::EmptyCurrent)));
    }

    #[test]
    fn test_nulls_excluded_from_bins() {
        let reference = scenario_a();
        let current = Dataset::new(vec![Column::numeric(
            "x",
            vec![
                Some(1.0),
                Some(1.0),
                None,
                Some(1.0),
                Some(1.0),
                Some(2.0),
                Some(2.0),
                Some(2.0),
                Some(3.0),
                Some(3.0),
                Some(3.0),
                None,
            ],
        )])
        .unwrap();

        let report = Drifter::new()
            .compute_drift(&reference, &current, None, &DriftConfig::default())
            .unwrap();
        let result = report.column("x").unwrap().result().unwrap();

        assert_eq!(result.current_nulls, 2);
        assert_eq!(result.current_count, 10);
        assert_eq!(result.psi, 0.0);
    }

    #[test]
    fn test_datetime_drifts_on_numeric_axis() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let reference = Dataset::new(vec![Column::datetime(
            "ts",
            (0..50).map(|d| Some(start + Duration::days(d))),
        )])
        .unwrap();
        let current = Dataset::new(vec![Column::datetime(
            "ts",
            (0..50).map(|d| Some(start + Duration::days(365 + d))),
        )])
        .unwrap();

        let report = Drifter::new()
            .compute_drift(&reference, &current, None, &DriftConfig::default())
            .unwrap();
        let result = report.column("ts").unwrap().result().unwrap();

        assert_eq!(result.bin_type, BinType::Numeric);
        assert!(result.drifted);
        // every current value lands in the open upper bin
        assert_eq!(result.bins.last().unwrap().current_proportion, 1.0);
    }

    #[test]
    fn test_column_selection() {
        let reference = Dataset::new(vec![
            Column::numeric_values("a", (0..20).map(|x| x as f64)),
            Column::numeric_values("b", (0..20).map(|x| x as f64)),
        ])
        .unwrap();
        let selection = vec!["b".to_string(), "b".to_string()];

        let report = Drifter::new()
            .compute_drift(&reference, &reference, Some(&selection), &DriftConfig::default())
            .unwrap();

        assert_eq!(report.columns.len(), 1);
        assert!(report.column("a").is_none());
    }
}
