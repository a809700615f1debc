pub mod binning;
pub mod drifter;
pub mod error;
pub mod psi;

pub use drifter::Drifter;
pub use error::DriftError;
pub use psi::{compute_kl, compute_psi, DriftMonitor};
