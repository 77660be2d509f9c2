//! Out-of-bag permutation importance for a fitted forest
//!
//! For each feature, its values are shuffled among every tree's out-of-bag
//! rows and the out-of-bag AUC is recomputed. Importance is the AUC lost.
//! Mean decrease in Gini is reported alongside.

use crate::error::Result;
use crate::evaluation::roc_curve;
use crate::model::folds::derive_seed;
use crate::model::{Dataset, ForestModel};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

/// Importance of one feature in the fitted forest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    /// 1 = most important
    pub rank: usize,
    pub feature: String,
    /// Out-of-bag AUC minus AUC with the feature permuted; `None` when the
    /// out-of-bag rows hold a single class
    pub permutation_auc_drop: Option<f64>,
    pub gini_decrease: f64,
}

/// Out-of-bag mean probability per dataset row, `None` for rows that were
/// in every bootstrap sample. `permute` replaces one feature's values.
fn oob_scores(model: &ForestModel, data: &Dataset, permute: Option<(usize, u64)>) -> Vec<Option<f64>> {
    let mut sums = vec![0.0; model.rows.len()];
    let mut counts = vec![0usize; model.rows.len()];
    let mut buffer = vec![0.0; data.n_features()];

    for (t, fitted) in model.trees.iter().enumerate() {
        let oob: Vec<usize> = (0..model.rows.len()).filter(|&p| !fitted.in_bag[p]).collect();

        let shuffled: Option<(usize, Vec<f64>)> = permute.map(|(feature, seed)| {
            let mut values: Vec<f64> = oob.iter().map(|&p| data.row(model.rows[p])[feature]).collect();
            let mut rng = StdRng::seed_from_u64(derive_seed(seed, t as u64));
            values.shuffle(&mut rng);
            (feature, values)
        });

        for (k, &p) in oob.iter().enumerate() {
            buffer.copy_from_slice(data.row(model.rows[p]));
            if let Some((feature, values)) = &shuffled {
                buffer[*feature] = values[k];
            }
            sums[p] += fitted.tree.predict(&buffer);
            counts[p] += 1;
        }
    }

    sums.iter()
        .zip(counts.iter())
        .map(|(&s, &c)| (c > 0).then(|| s / c as f64))
        .collect()
}

fn oob_auc(model: &ForestModel, data: &Dataset, scores: &[Option<f64>]) -> Result<f64> {
    let mut labels = Vec::new();
    let mut values = Vec::new();
    for (p, score) in scores.iter().enumerate() {
        if let Some(s) = score {
            labels.push(data.label(model.rows[p]));
            values.push(*s);
        }
    }
    Ok(roc_curve(&labels, &values)?.auc)
}

/// Rank the forest's features by permutation importance (Gini as tie-break
/// and as fallback when out-of-bag AUC is undefined).
pub fn permutation_importance(model: &ForestModel, data: &Dataset, seed: u64) -> Vec<FeatureImportance> {
    let baseline = match oob_auc(model, data, &oob_scores(model, data, None)) {
        Ok(auc) => {
            debug!("Out-of-bag AUC {:.4}", auc);
            Some(auc)
        }
        Err(e) => {
            warn!("Permutation importance unavailable, ranking by Gini decrease: {}", e);
            None
        }
    };

    let drops: Vec<Option<f64>> = (0..data.n_features())
        .into_par_iter()
        .map(|feature| {
            let base = baseline?;
            let scores = oob_scores(model, data, Some((feature, derive_seed(seed, feature as u64))));
            oob_auc(model, data, &scores).ok().map(|auc| base - auc)
        })
        .collect();

    let mut table: Vec<FeatureImportance> = model
        .feature_names
        .iter()
        .zip(drops)
        .zip(model.gini_decrease.iter())
        .map(|((feature, drop), &gini)| FeatureImportance {
            rank: 0,
            feature: feature.clone(),
            permutation_auc_drop: drop,
            gini_decrease: gini,
        })
        .collect();

    // Stable sort keeps feature order for exact ties
    table.sort_by(|a, b| {
        let pa = a.permutation_auc_drop.unwrap_or(f64::NEG_INFINITY);
        let pb = b.permutation_auc_drop.unwrap_or(f64::NEG_INFINITY);
        pb.total_cmp(&pa).then(b.gini_decrease.total_cmp(&a.gini_decrease))
    });
    for (i, entry) in table.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    table
}
