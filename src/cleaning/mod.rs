//! Cleaning and aggregation of chart-week records into one row per song

pub mod aggregate;
pub mod summary;

pub use aggregate::{clean, CleaningOutput, CleaningReport};
pub use summary::{yearly_summary, YearSummary};
