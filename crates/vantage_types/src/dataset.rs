use crate::error::TypeError;
use crate::fingerprint::DatasetFingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::OnceLock;
use strum_macros::{Display, EnumString};

/// Declared kind of a column. Resolved once when the column is built.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Boolean,
    Datetime,
    Text,
}

impl ColumnKind {
    /// Stable byte tag used in canonical serialization.
    pub fn tag(&self) -> u8 {
        match self {
            ColumnKind::Numeric => 1,
            ColumnKind::Categorical => 2,
            ColumnKind::Boolean => 3,
            ColumnKind::Datetime => 4,
            ColumnKind::Text => 5,
        }
    }

    /// Kinds whose values are binned as categories during drift.
    pub fn is_categorical_like(&self) -> bool {
        matches!(
            self,
            ColumnKind::Categorical | ColumnKind::Boolean | ColumnKind::Text
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
    Boolean(Vec<Option<bool>>),
    Datetime(Vec<Option<DateTime<Utc>>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
            ColumnData::Boolean(_) => ColumnKind::Boolean,
            ColumnData::Datetime(_) => ColumnKind::Datetime,
            ColumnData::Text(_) => ColumnKind::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) | ColumnData::Text(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Datetime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        self.slice(0..self.len()).null_count()
    }

    /// Borrow a row range of the column.
    pub fn slice(&self, range: Range<usize>) -> ColumnSlice<'_> {
        match self {
            ColumnData::Numeric(v) => ColumnSlice::Numeric(&v[range]),
            ColumnData::Categorical(v) => ColumnSlice::Categorical(&v[range]),
            ColumnData::Boolean(v) => ColumnSlice::Boolean(&v[range]),
            ColumnData::Datetime(v) => ColumnSlice::Datetime(&v[range]),
            ColumnData::Text(v) => ColumnSlice::Text(&v[range]),
        }
    }

    /// Non-null values rendered as labels, for kinds treated as categories.
    ///
    /// Returns `None` for numeric and datetime columns.
    pub fn labels(&self) -> Option<Vec<Option<String>>> {
        match self {
            ColumnData::Categorical(v) | ColumnData::Text(v) => Some(v.clone()),
            ColumnData::Boolean(v) => Some(
                v.iter()
                    .map(|value| value.map(|b| b.to_string()))
                    .collect(),
            ),
            ColumnData::Numeric(_) | ColumnData::Datetime(_) => None,
        }
    }

    /// Values on a numeric axis: numbers as-is, datetimes as epoch milliseconds.
    ///
    /// Returns `None` for kinds treated as categories.
    pub fn numeric_axis(&self) -> Option<Vec<Option<f64>>> {
        match self {
            ColumnData::Numeric(v) => Some(v.clone()),
            ColumnData::Datetime(v) => Some(
                v.iter()
                    .map(|value| value.map(|ts| ts.timestamp_millis() as f64))
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Borrowed view over a row range of a column.
#[derive(Debug, Clone, Copy)]
pub enum ColumnSlice<'a> {
    Numeric(&'a [Option<f64>]),
    Categorical(&'a [Option<String>]),
    Boolean(&'a [Option<bool>]),
    Datetime(&'a [Option<DateTime<Utc>>]),
    Text(&'a [Option<String>]),
}

impl ColumnSlice<'_> {
    pub fn len(&self) -> usize {
        match self {
            ColumnSlice::Numeric(v) => v.len(),
            ColumnSlice::Categorical(v) | ColumnSlice::Text(v) => v.len(),
            ColumnSlice::Boolean(v) => v.len(),
            ColumnSlice::Datetime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        match self {
            ColumnSlice::Numeric(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnSlice::Categorical(v) | ColumnSlice::Text(v) => {
                v.iter().filter(|x| x.is_none()).count()
            }
            ColumnSlice::Boolean(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnSlice::Datetime(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        let data = match data {
            ColumnData::Numeric(values) => ColumnData::Numeric(normalize_numeric(values)),
            other => other,
        };
        Self {
            name: name.into(),
            data,
        }
    }

    /// Numeric column. NaN and infinite values are stored as nulls.
    pub fn numeric(name: impl Into<String>, values: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self::new(name, ColumnData::Numeric(values.into_iter().collect()))
    }

    pub fn numeric_values(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::numeric(name, values.into_iter().map(Some))
    }

    pub fn categorical<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<S>>,
    ) -> Self {
        Self::new(
            name,
            ColumnData::Categorical(values.into_iter().map(|v| v.map(Into::into)).collect()),
        )
    }

    pub fn categorical_values<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::categorical(name, values.into_iter().map(Some))
    }

    pub fn boolean(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<bool>>,
    ) -> Self {
        Self::new(name, ColumnData::Boolean(values.into_iter().collect()))
    }

    pub fn boolean_values(name: impl Into<String>, values: impl IntoIterator<Item = bool>) -> Self {
        Self::boolean(name, values.into_iter().map(Some))
    }

    pub fn datetime(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<DateTime<Utc>>>,
    ) -> Self {
        Self::new(name, ColumnData::Datetime(values.into_iter().collect()))
    }

    pub fn text<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<S>>,
    ) -> Self {
        Self::new(
            name,
            ColumnData::Text(values.into_iter().map(|v| v.map(Into::into)).collect()),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn normalize_numeric(values: Vec<Option<f64>>) -> Vec<Option<f64>> {
    values
        .into_iter()
        .map(|value| value.filter(|x| x.is_finite()))
        .collect()
}

/// Immutable rectangular table of named, typed columns.
#[derive(Debug)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
    fingerprint: OnceLock<DatasetFingerprint>,
}

impl Clone for Dataset {
    fn clone(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            row_count: self.row_count,
            fingerprint: OnceLock::new(),
        }
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Dataset {
    /// Build a dataset, rejecting ragged columns and duplicate names.
    pub fn new(columns: Vec<Column>) -> Result<Self, TypeError> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        let dataset = Self {
            columns,
            row_count,
            fingerprint: OnceLock::new(),
        };
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        let mut seen = HashSet::with_capacity(self.columns.len());

        for column in &self.columns {
            if !seen.insert(column.name()) {
                return Err(TypeError::DuplicateColumn(column.name().to_string()));
            }
            if column.len() != self.row_count {
                return Err(TypeError::ColumnLengthMismatch {
                    column: column.name().to_string(),
                    expected: self.row_count,
                    found: column.len(),
                });
            }
        }
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Content fingerprint, computed on first use and memoized.
    pub fn fingerprint(&self) -> Result<DatasetFingerprint, TypeError> {
        if let Some(fp) = self.fingerprint.get() {
            return Ok(fp.clone());
        }
        let fp = DatasetFingerprint::compute(self)?;
        Ok(self.fingerprint.get_or_init(|| fp).clone())
    }

    /// Lazy single-pass producer of row batches of at most `batch_rows` rows.
    pub fn batches(&self, batch_rows: usize) -> DatasetBatches<'_> {
        DatasetBatches {
            dataset: self,
            batch_rows: batch_rows.max(1),
            offset: 0,
        }
    }
}

/// A row range across every column of a dataset.
#[derive(Debug)]
pub struct DatasetBatch<'a> {
    pub offset: usize,
    pub rows: usize,
    columns: Vec<(&'a str, ColumnSlice<'a>)>,
}

impl<'a> DatasetBatch<'a> {
    pub fn column(&self, name: &str) -> Option<ColumnSlice<'a>> {
        self.columns
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, slice)| *slice)
    }

    pub fn columns(&self) -> &[(&'a str, ColumnSlice<'a>)] {
        &self.columns
    }
}

pub struct DatasetBatches<'a> {
    dataset: &'a Dataset,
    batch_rows: usize,
    offset: usize,
}

impl<'a> Iterator for DatasetBatches<'a> {
    type Item = DatasetBatch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.dataset.row_count {
            return None;
        }
        let end = (self.offset + self.batch_rows).min(self.dataset.row_count);
        let range = self.offset..end;
        let columns = self
            .dataset
            .columns
            .iter()
            .map(|c| (c.name(), c.data().slice(range.clone())))
            .collect();

        let batch = DatasetBatch {
            offset: self.offset,
            rows: end - self.offset,
            columns,
        };
        self.offset = end;
        Some(batch)
    }
}
