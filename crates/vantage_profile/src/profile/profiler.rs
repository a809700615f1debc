use crate::error::DataProfileError;
use crate::profile::datetime_profiler::DatetimeProfiler;
use crate::profile::num_profiler::NumProfiler;
use crate::profile::stats::CorrelationAccumulator;
use crate::profile::string_profiler::StringProfiler;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, instrument};
use vantage_types::{
    CategoricalStats, Column, ColumnKind, ColumnProfile, ColumnSlice, DataProfile, Dataset,
    ProfileConfig,
};

/// Rows handed to the accumulators at a time.
pub const BATCH_ROWS: usize = 8192;

#[derive(Debug)]
enum Accumulator {
    Numeric(NumProfiler),
    Strings(StringProfiler),
    Datetime(DatetimeProfiler),
}

#[derive(Debug)]
struct ColumnAccumulator {
    name: String,
    kind: ColumnKind,
    state: Accumulator,
}

impl ColumnAccumulator {
    fn new(column: &Column) -> Self {
        let state = match column.kind() {
            ColumnKind::Numeric => Accumulator::Numeric(NumProfiler::new()),
            ColumnKind::Categorical | ColumnKind::Text => {
                Accumulator::Strings(StringProfiler::new(true))
            }
            ColumnKind::Boolean => Accumulator::Strings(StringProfiler::new(false)),
            ColumnKind::Datetime => Accumulator::Datetime(DatetimeProfiler::new()),
        };

        Self {
            name: column.name().to_string(),
            kind: column.kind(),
            state,
        }
    }

    fn update(&mut self, slice: ColumnSlice<'_>) {
        match (&mut self.state, slice) {
            (Accumulator::Numeric(p), ColumnSlice::Numeric(values)) => p.update(values),
            (Accumulator::Strings(p), ColumnSlice::Categorical(values))
            | (Accumulator::Strings(p), ColumnSlice::Text(values)) => p.update(values),
            (Accumulator::Strings(p), ColumnSlice::Boolean(values)) => p.update_bool(values),
            (Accumulator::Datetime(p), ColumnSlice::Datetime(values)) => p.update(values),
            // accumulators are built from the column kind
            _ => {}
        }
    }

    fn finish(self, config: &ProfileConfig) -> ColumnProfile {
        let mut profile = ColumnProfile {
            name: self.name,
            kind: self.kind,
            count: 0,
            null_count: 0,
            non_null_count: 0,
            numeric_stats: None,
            categorical_stats: None,
            char_stats: None,
            datetime_stats: None,
        };

        let (rows, nulls) = match self.state {
            Accumulator::Numeric(p) => {
                let counts = (p.rows(), p.null_count());
                profile.numeric_stats = Some(p.finish(config.histogram_bins));
                counts
            }
            Accumulator::Strings(mut p) => {
                let counts = (p.rows(), p.null_count());
                let (stats, char_stats): (CategoricalStats, _) = p.finish(config.top_k);
                profile.categorical_stats = Some(stats);
                profile.char_stats = char_stats;
                counts
            }
            Accumulator::Datetime(p) => {
                profile.datetime_stats = Some(p.finish());
                (p.rows(), p.null_count())
            }
        };

        profile.count = rows;
        profile.null_count = nulls;
        profile.non_null_count = rows - nulls;
        profile
    }
}

/// Profiles datasets in one pass over row batches.
#[derive(Debug, Clone, Default)]
pub struct DataProfiler {
    config: ProfileConfig,
}

impl DataProfiler {
    pub fn new(config: ProfileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Resolve the columns to profile. Every requested name must exist.
    fn select<'a>(
        dataset: &'a Dataset,
        columns: Option<&[String]>,
    ) -> Result<Vec<&'a Column>, DataProfileError> {
        match columns {
            None => Ok(dataset.columns().iter().collect()),
            Some(names) => {
                if let Some(missing) = names.iter().find(|n| dataset.column(n).is_none()) {
                    return Err(DataProfileError::ColumnNotFound(missing.clone()));
                }
                Ok(dataset
                    .columns()
                    .iter()
                    .filter(|c| names.iter().any(|n| n == c.name()))
                    .collect())
            }
        }
    }

    /// Profile `dataset`, restricted to `columns` when given.
    ///
    /// # Arguments
    ///
    /// * `dataset` - Dataset to profile
    /// * `columns` - Optional column selection; unknown names are an error
    ///
    /// # Returns
    ///
    /// * `DataProfile` - Per-column statistics and, when enabled, the
    ///   correlation matrix of the numeric columns
    #[instrument(skip_all, fields(rows = dataset.row_count()))]
    pub fn profile(
        &self,
        dataset: &Dataset,
        columns: Option<&[String]>,
    ) -> Result<DataProfile, DataProfileError> {
        let selected = Self::select(dataset, columns)?;

        let mut accumulators = selected
            .iter()
            .map(|c| ColumnAccumulator::new(c))
            .collect::<Vec<_>>();

        let numeric_columns = selected
            .iter()
            .filter(|c| c.kind() == ColumnKind::Numeric)
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>();

        let mut correlations = (self.config.compute_correlations && numeric_columns.len() >= 2)
            .then(|| CorrelationAccumulator::new(numeric_columns));

        let mut batch_count = 0;
        for batch in dataset.batches(BATCH_ROWS) {
            accumulators.par_iter_mut().for_each(|acc| {
                if let Some(slice) = batch.column(&acc.name) {
                    acc.update(slice);
                }
            });

            if let Some(corr) = correlations.as_mut() {
                corr.update(&batch);
            }
            batch_count += 1;
        }

        debug!(
            columns = accumulators.len(),
            batches = batch_count,
            "Profiled dataset"
        );

        let columns = accumulators
            .into_par_iter()
            .map(|acc| (acc.name.clone(), acc.finish(&self.config)))
            .collect::<BTreeMap<_, _>>();

        let correlations = match correlations {
            Some(corr) => corr.finish()?,
            None => None,
        };

        Ok(DataProfile {
            row_count: dataset.row_count(),
            columns,
            correlations,
        })
    }
}
