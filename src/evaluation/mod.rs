//! Discrimination curves and area-under-curve summaries

pub mod roc;

pub use roc::{auc_mann_whitney, roc_curve, RocCurve, RocPoint};
