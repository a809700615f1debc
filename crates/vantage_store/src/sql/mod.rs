pub mod query;
pub mod schema;
pub mod sqlite;

pub use sqlite::SqlMetricBackend;
