use chrono::{DateTime, Utc};
use vantage_types::{DatetimeStats, Statistic};

#[derive(Debug, Default, Clone)]
pub struct DatetimeProfiler {
    min: Option<DateTime<Utc>>,
    max: Option<DateTime<Utc>>,
    null_count: usize,
    rows: usize,
}

impl DatetimeProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, batch: &[Option<DateTime<Utc>>]) {
        self.rows += batch.len();

        for value in batch {
            match value {
                Some(ts) => {
                    self.min = Some(self.min.map_or(*ts, |m| m.min(*ts)));
                    self.max = Some(self.max.map_or(*ts, |m| m.max(*ts)));
                }
                None => self.null_count += 1,
            }
        }
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(&self) -> DatetimeStats {
        let span_seconds = match (self.min, self.max) {
            (Some(min), Some(max)) => {
                Statistic::from_f64((max - min).num_milliseconds() as f64 / 1000.0)
            }
            _ => Statistic::Undefined,
        };

        DatetimeStats {
            min: self.min,
            max: self.max,
            span_seconds,
        }
    }
}
