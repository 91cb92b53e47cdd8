//! Shared primitives: calendar time bucketing.

pub mod window;

// Re-export public API
pub use window::{bucket_start, Granularity, MonthKey};
