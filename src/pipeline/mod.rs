//! Stage sequencing from source CSV to exported report

pub mod orchestrator;

pub use orchestrator::{analyze, prepare, run, train, Analysis, ModelOutcome, PipelineResult, PreparedData};
