//! Unified error types for hitlab
//!
//! Error strategy:
//! - Input-format and output errors: Fatal, abort the run before/after stages
//! - Model errors (training, convergence, degenerate labels): Recoverable,
//!   mark that model failed and continue with the other
//!
//! Dropped records are not errors; they are counted in the cleaning report.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for hitlab operations
#[derive(Debug, Error)]
pub enum HitlabError {
    // =========================================================================
    // Fatal errors - abort entire run
    // =========================================================================
    #[error("Required columns missing from '{path}': {}\n  Tip: accepted header names are {hint}", missing.join(", "))]
    MissingColumns {
        path: PathBuf,
        missing: Vec<String>,
        hint: String,
    },

    #[error("Malformed record in '{path}' at line {line}: {reason}")]
    MalformedRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Cannot read input '{path}': {reason}\n  Tip: the source must be a UTF-8 delimited file with a header row")]
    InputError { path: PathBuf, reason: String },

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    // =========================================================================
    // Recoverable errors - fail one model, continue run
    // =========================================================================
    #[error("Not enough data for {context}: {reason}")]
    InsufficientData { context: String, reason: String },

    #[error("Training failed for {model}: {reason}")]
    TrainingError { model: String, reason: String },

    #[error("{model} did not converge after {iterations} iterations")]
    NotConverged { model: String, iterations: usize },

    #[error("Discrimination curve undefined: {positives} Hit and {negatives} NoHit records (both classes required)")]
    DegenerateLabels { positives: usize, negatives: usize },

    #[error("Invalid scores: {0}")]
    InvalidScores(String),
}

/// Result type alias for hitlab operations
pub type Result<T> = std::result::Result<T, HitlabError>;

impl HitlabError {
    /// Returns true if this error should fail a single model rather than the run
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HitlabError::InsufficientData { .. }
                | HitlabError::TrainingError { .. }
                | HitlabError::NotConverged { .. }
                | HitlabError::DegenerateLabels { .. }
                | HitlabError::InvalidScores(_)
        )
    }

    /// Create a malformed-record error
    pub fn malformed(path: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        HitlabError::MalformedRecord {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create a training error for the named model
    pub fn training(model: impl Into<String>, reason: impl Into<String>) -> Self {
        HitlabError::TrainingError {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        HitlabError::OutputError {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Create an output error from an IO error, with a friendlier reason
    pub fn output_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        HitlabError::OutputError { path, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_split() {
        assert!(HitlabError::training("logistic", "boom").is_recoverable());
        assert!(HitlabError::DegenerateLabels {
            positives: 0,
            negatives: 4
        }
        .is_recoverable());
        assert!(!HitlabError::ConfigError("bad".into()).is_recoverable());
        assert!(!HitlabError::malformed("x.csv", 3, "bad rank").is_recoverable());
    }

    #[test]
    fn test_missing_columns_message_lists_all() {
        let err = HitlabError::MissingColumns {
            path: PathBuf::from("songs.csv"),
            missing: vec!["rank".into(), "tempo".into()],
            hint: "ranking|rank".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("rank, tempo"));
        assert!(msg.contains("ranking|rank"));
    }
}
