pub mod backend;
pub mod error;
pub mod sql;
pub mod store;

pub use backend::{InMemoryBackend, IndexRecord, InsertOutcome, MetricBackend};
pub use error::{FlightError, StoreError};
pub use sql::SqlMetricBackend;
pub use store::{MetricStore, StoreOptions};
