//! ROC curve construction and AUC
//!
//! Records are swept in descending score order. Tied scores form a single
//! threshold step, so the curve never depends on how ties happen to be
//! ordered.

use crate::error::{HitlabError, Result};
use serde::Serialize;

/// One threshold step of the curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RocPoint {
    /// Records scoring at or above this are predicted Hit; `+inf` for the origin
    pub threshold: f64,
    pub fpr: f64,
    pub tpr: f64,
}

/// Discrimination curve plus its trapezoidal area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocCurve {
    /// Increasing false-positive rate, from (0, 0) to (1, 1)
    pub points: Vec<RocPoint>,
    pub auc: f64,
    pub positives: usize,
    pub negatives: usize,
}

fn check_inputs(labels: &[bool], scores: &[f64]) -> Result<(usize, usize)> {
    if labels.len() != scores.len() {
        return Err(HitlabError::InvalidScores(format!(
            "{} labels but {} scores",
            labels.len(),
            scores.len()
        )));
    }
    if let Some(i) = scores.iter().position(|s| !s.is_finite()) {
        return Err(HitlabError::InvalidScores(format!(
            "score at position {} is not finite ({})",
            i, scores[i]
        )));
    }
    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(HitlabError::DegenerateLabels { positives, negatives });
    }
    Ok((positives, negatives))
}

/// Build the ROC curve for `scores` (higher = more likely Hit).
///
/// Fails with `DegenerateLabels` unless both classes are present.
pub fn roc_curve(labels: &[bool], scores: &[f64]) -> Result<RocCurve> {
    let (positives, negatives) = check_inputs(labels, scores)?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let p = positives as f64;
    let n = negatives as f64;
    let mut points = Vec::with_capacity(order.len() + 1);
    points.push(RocPoint {
        threshold: f64::INFINITY,
        fpr: 0.0,
        tpr: 0.0,
    });

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut auc = 0.0;
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        // `==` so that -0.0 and 0.0 fall in one group; the sort keeps them adjacent
        while i < order.len() && scores[order[i]] == threshold {
            if labels[order[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }

        let prev = points[points.len() - 1];
        let point = RocPoint {
            threshold,
            fpr: fp as f64 / n,
            tpr: tp as f64 / p,
        };
        auc += (point.fpr - prev.fpr) * (point.tpr + prev.tpr) / 2.0;
        points.push(point);
    }

    Ok(RocCurve {
        points,
        auc: auc.clamp(0.0, 1.0),
        positives,
        negatives,
    })
}

/// Rank-based AUC: probability a random Hit outscores a random NoHit,
/// counting ties as one half (mid-ranks).
pub fn auc_mann_whitney(labels: &[bool], scores: &[f64]) -> Result<f64> {
    let (positives, negatives) = check_inputs(labels, scores)?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j < order.len() && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        // Ranks i+1..=j share their average
        let mid_rank = (i + 1 + j) as f64 / 2.0;
        rank_sum += mid_rank * order[i..j].iter().filter(|&&k| labels[k]).count() as f64;
        i = j;
    }

    let p = positives as f64;
    let u = rank_sum - p * (p + 1.0) / 2.0;
    Ok(u / (p * negatives as f64))
}
