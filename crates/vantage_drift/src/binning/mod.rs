pub mod equal_width;
pub mod quantile;
pub mod strategy;

pub use equal_width::EqualWidthBinning;
pub use quantile::QuantileBinning;
pub use strategy::BinningStrategy;
