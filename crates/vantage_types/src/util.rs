use crate::error::TypeError;
use serde::Serialize;

/// Sample quantile of already sorted data using the R-7 definition
/// (Hyndman & Fan type 7, the default in R and numpy).
///
/// h = (n - 1) * p, Q(p) = x[floor(h)] + (h - floor(h)) * (x[floor(h) + 1] - x[floor(h)])
///
/// Returns `None` for empty input.
pub fn quantile_r7(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let p = p.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * p;
    let j = h.floor() as usize;
    let next = (j + 1).min(sorted.len() - 1);
    let frac = h - j as f64;

    Some(sorted[j] + frac * (sorted[next] - sorted[j]))
}

/// Sort floats ascending. Callers only pass finite values.
pub fn sort_floats(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

pub struct RecordFuncs {}

impl RecordFuncs {
    pub fn pretty_json<T: Serialize>(object: T) -> String {
        match serde_json::to_string_pretty(&object) {
            Ok(json) => json,
            Err(e) => format!("Failed to serialize record: {e}"),
        }
    }

    pub fn json<T: Serialize>(object: T) -> Result<String, TypeError> {
        Ok(serde_json::to_string(&object)?)
    }
}
