//! Model training: shared resampling plan, two classifiers, importance
//!
//! Both classifiers are fitted through the `Classifier` trait so the
//! cross-validation loop treats them identically.

pub mod cv;
pub mod dataset;
pub mod folds;
pub mod forest;
pub mod importance;
pub mod logistic;
pub mod traits;
pub mod trainer;
pub mod tree;

pub use cv::{cross_validate, CvOutcome, FoldScore};
pub use dataset::Dataset;
pub use folds::FoldPlan;
pub use forest::{ForestModel, ForestParams, RandomForest};
pub use importance::{permutation_importance, FeatureImportance};
pub use logistic::{Coefficient, LogisticModel, LogisticRegression};
pub use traits::{Classifier, ProbabilityModel};
pub use trainer::{train_forest, train_logistic, ForestReport, GridScore, LogisticReport};
pub use tree::{DecisionTree, TreeConfig};
