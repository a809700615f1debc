use serde::{Deserialize, Serialize};

/// A computed statistic, or `Undefined` when the data cannot support it.
///
/// `Undefined` is distinct from zero and is never represented as NaN:
/// it serializes as the string `"undefined"`, a value as `{"value": x}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Value(f64),
    #[default]
    Undefined,
}

impl Statistic {
    /// Wraps a float, mapping NaN and infinities to `Undefined`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Statistic::Value(value)
        } else {
            Statistic::Undefined
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Statistic::Value(v) => Some(*v),
            Statistic::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Statistic::Undefined)
    }
}

impl From<Option<f64>> for Statistic {
    fn from(value: Option<f64>) -> Self {
        value.map(Statistic::from_f64).unwrap_or(Statistic::Undefined)
    }
}
