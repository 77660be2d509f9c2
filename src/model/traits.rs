//! Classifier trait abstractions
//!
//! These traits define the interface cross-validation uses to fit and score
//! either model without knowing which one it is.

use crate::error::Result;
use crate::model::Dataset;

/// A fitted model producing P(label = Hit)
pub trait ProbabilityModel: Send + Sync {
    /// Probability of Hit for one feature row
    fn predict_proba(&self, row: &[f64]) -> f64;
}

/// An unfitted classifier configuration
pub trait Classifier: Send + Sync {
    /// Fit on the given rows of `data`
    fn fit(&self, data: &Dataset, rows: &[usize]) -> Result<Box<dyn ProbabilityModel>>;

    /// Short name for logs and output files
    fn name(&self) -> &'static str;

    /// Name plus configuration, for logs
    fn describe(&self) -> String {
        self.name().to_string()
    }
}
