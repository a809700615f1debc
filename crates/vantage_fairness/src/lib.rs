pub mod error;
pub mod outcome;
pub mod parity;

pub use error::FairnessError;
pub use outcome::{binarize_outcome, group_labels};
pub use parity::FairnessAnalyzer;
