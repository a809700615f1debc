pub mod datetime_profiler;
pub mod moments;
pub mod num_profiler;
pub mod profiler;
pub mod stats;
pub mod string_profiler;

pub use datetime_profiler::*;
pub use moments::*;
pub use num_profiler::*;
pub use profiler::*;
pub use stats::*;
pub use string_profiler::*;
