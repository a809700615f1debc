pub mod error;
pub mod profile;

pub use error::DataProfileError;
pub use profile::*;
