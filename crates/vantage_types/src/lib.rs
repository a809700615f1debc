pub mod config;
pub mod dataset;
pub mod drift;
pub mod error;
pub mod fairness;
pub mod fingerprint;
pub mod profile;
pub mod records;
pub mod statistic;
pub mod util;

pub use config::*;
pub use dataset::*;
pub use drift::*;
pub use error::TypeError;
pub use fairness::*;
pub use fingerprint::*;
pub use profile::*;
pub use records::*;
pub use statistic::*;
pub use util::*;
