//! K-fold cross-validation over a shared `FoldPlan`
//!
//! Folds are fitted in parallel. Out-of-fold predictions are written back by
//! row index after every fold has finished, and per-fold AUCs are averaged
//! in fold order, so results do not depend on thread scheduling.

use crate::error::{HitlabError, Result};
use crate::evaluation::roc_curve;
use crate::model::{Classifier, Dataset, FoldPlan};
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

/// Held-out discrimination for one fold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldScore {
    pub fold: usize,
    pub test_size: usize,
    pub positives: usize,
    /// `None` when the held-out rows contain a single class
    pub auc: Option<f64>,
}

impl FoldScore {
    pub fn is_degenerate(&self) -> bool {
        self.auc.is_none()
    }
}

/// Result of cross-validating one classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CvOutcome {
    /// Out-of-fold P(Hit), aligned with dataset rows
    pub predictions: Vec<f64>,
    pub folds: Vec<FoldScore>,
    /// Mean AUC over folds where it is defined
    pub mean_auc: Option<f64>,
}

impl CvOutcome {
    pub fn degenerate_folds(&self) -> Vec<usize> {
        self.folds
            .iter()
            .filter(|f| f.is_degenerate())
            .map(|f| f.fold)
            .collect()
    }
}

/// Cross-validate `classifier` on `data` using `plan`
pub fn cross_validate(
    classifier: &dyn Classifier,
    data: &Dataset,
    plan: &FoldPlan,
    progress: Option<&ProgressBar>,
) -> Result<CvOutcome> {
    if plan.len() != data.len() {
        return Err(HitlabError::InsufficientData {
            context: classifier.describe(),
            reason: format!("fold plan covers {} rows, dataset has {}", plan.len(), data.len()),
        });
    }

    let per_fold: Vec<(Vec<usize>, Vec<f64>)> = (0..plan.k())
        .into_par_iter()
        .map(|fold| -> Result<(Vec<usize>, Vec<f64>)> {
            let train = plan.train_rows(fold);
            let test = plan.test_rows(fold);
            let model = classifier.fit(data, &train)?;
            let scores: Vec<f64> = test.iter().map(|&r| model.predict_proba(data.row(r))).collect();
            if let Some(pb) = progress {
                pb.inc(1);
            }
            Ok((test, scores))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut predictions = vec![f64::NAN; data.len()];
    let mut folds = Vec::with_capacity(plan.k());

    for (fold, (test, scores)) in per_fold.into_iter().enumerate() {
        let labels: Vec<bool> = test.iter().map(|&r| data.label(r)).collect();
        let positives = labels.iter().filter(|&&l| l).count();

        let auc = match roc_curve(&labels, &scores) {
            Ok(curve) => Some(curve.auc),
            Err(HitlabError::DegenerateLabels { positives, negatives }) => {
                warn!(
                    "{}: fold {} holds {} Hit / {} NoHit rows; AUC undefined, excluded from the mean",
                    classifier.describe(),
                    fold,
                    positives,
                    negatives
                );
                None
            }
            Err(e) => return Err(e),
        };

        for (&row, &score) in test.iter().zip(scores.iter()) {
            predictions[row] = score;
        }
        folds.push(FoldScore {
            fold,
            test_size: test.len(),
            positives,
            auc,
        });
    }

    let defined: Vec<f64> = folds.iter().filter_map(|f| f.auc).collect();
    let mean_auc = (!defined.is_empty()).then(|| defined.iter().sum::<f64>() / defined.len() as f64);

    match mean_auc {
        Some(auc) => debug!(
            "{}: mean fold AUC {:.4} over {}/{} folds",
            classifier.describe(),
            auc,
            defined.len(),
            folds.len()
        ),
        None => warn!("{}: no fold had both classes; mean AUC undefined", classifier.describe()),
    }

    Ok(CvOutcome {
        predictions,
        folds,
        mean_auc,
    })
}
