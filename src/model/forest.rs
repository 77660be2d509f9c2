//! Random forest: bagged CART trees with per-split feature subsampling
//!
//! Each tree gets its own seed derived from the forest seed and its index,
//! and trees are collected in index order, so the fitted forest does not
//! depend on how rayon schedules the work.

use crate::error::{HitlabError, Result};
use crate::model::folds::derive_seed;
use crate::model::tree::{DecisionTree, TreeBuilder, TreeConfig};
use crate::model::{Classifier, Dataset, ProbabilityModel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use tracing::debug;

const MODEL_NAME: &str = "random_forest";

/// One grid point of the forest sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub mtry: usize,
    pub min_samples_leaf: usize,
    pub max_depth: Option<usize>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            mtry: 3,
            min_samples_leaf: 1,
            max_depth: Some(40),
        }
    }
}

impl fmt::Display for ForestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trees={} mtry={}", self.n_trees, self.mtry)
    }
}

impl ForestParams {
    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            mtry: self.mtry,
            min_samples_leaf: self.min_samples_leaf,
            max_depth: self.max_depth,
        }
    }
}

/// Unfitted forest configuration plus seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomForest {
    pub params: ForestParams,
    pub seed: u64,
}

impl RandomForest {
    pub fn new(params: ForestParams, seed: u64) -> Self {
        Self { params, seed }
    }

    /// Fit on `rows` of `data`, returning the concrete model
    pub fn fit_rows(&self, data: &Dataset, rows: &[usize]) -> Result<ForestModel> {
        if rows.is_empty() {
            return Err(HitlabError::InsufficientData {
                context: MODEL_NAME.into(),
                reason: "no training rows".into(),
            });
        }
        if self.params.n_trees == 0 {
            return Err(HitlabError::training(MODEL_NAME, "forest needs at least one tree"));
        }

        let config = self.params.tree_config();
        let n = rows.len();

        let grown: Vec<(FittedTree, Vec<f64>)> = (0..self.params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(derive_seed(self.seed, t as u64));
                let mut in_bag = vec![false; n];
                let sample: Vec<usize> = (0..n)
                    .map(|_| {
                        let pos = rng.gen_range(0..n);
                        in_bag[pos] = true;
                        rows[pos]
                    })
                    .collect();
                let (tree, decrease) = TreeBuilder::new(data, config).build(&sample, &mut rng);
                (FittedTree { tree, in_bag }, decrease)
            })
            .collect();

        let mut gini_decrease = vec![0.0; data.n_features()];
        let mut trees = Vec::with_capacity(grown.len());
        for (tree, decrease) in grown {
            for (total, d) in gini_decrease.iter_mut().zip(decrease) {
                *total += d;
            }
            trees.push(tree);
        }
        let n_trees = trees.len() as f64;
        for total in gini_decrease.iter_mut() {
            *total /= n_trees;
        }

        debug!(
            "Grew {} trees ({}) on {} rows, mean {:.1} leaves",
            trees.len(),
            self.params,
            n,
            trees.iter().map(|t| t.tree.leaf_count()).sum::<usize>() as f64 / n_trees
        );

        Ok(ForestModel {
            params: self.params,
            feature_names: data.feature_names().to_vec(),
            rows: rows.to_vec(),
            trees,
            gini_decrease,
        })
    }
}

impl Classifier for RandomForest {
    fn fit(&self, data: &Dataset, rows: &[usize]) -> Result<Box<dyn ProbabilityModel>> {
        Ok(Box::new(self.fit_rows(data, rows)?))
    }

    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn describe(&self) -> String {
        format!("{} ({})", MODEL_NAME, self.params)
    }
}

/// A tree with the bootstrap membership of its training rows
#[derive(Debug, Clone)]
pub struct FittedTree {
    pub tree: DecisionTree,
    /// Indexed by position in `ForestModel::rows`
    pub in_bag: Vec<bool>,
}

/// Fitted forest
#[derive(Debug, Clone)]
pub struct ForestModel {
    pub params: ForestParams,
    pub feature_names: Vec<String>,
    /// Dataset rows the forest was trained on
    pub rows: Vec<usize>,
    pub trees: Vec<FittedTree>,
    /// Mean decrease in Gini impurity per feature, averaged over trees
    pub gini_decrease: Vec<f64>,
}

impl ProbabilityModel for ForestModel {
    fn predict_proba(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.tree.predict(row)).sum();
        total / self.trees.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::roc_curve;

    fn noisy_threshold(n: usize) -> Dataset {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let x = i as f64 / n as f64;
                vec![x, ((i * 13) % 7) as f64, ((i * 5) % 11) as f64 / 11.0]
            })
            .collect();
        let labels = (0..n).map(|i| i as f64 / n as f64 > 0.7).collect();
        Dataset::new(vec!["signal".into(), "noise_a".into(), "noise_b".into()], rows, labels).unwrap()
    }

    #[test]
    fn test_same_seed_same_forest() {
        let data = noisy_threshold(60);
        let rows: Vec<usize> = (0..data.len()).collect();
        let params = ForestParams {
            n_trees: 12,
            mtry: 2,
            ..ForestParams::default()
        };
        let a = RandomForest::new(params, 9).fit_rows(&data, &rows).unwrap();
        let b = RandomForest::new(params, 9).fit_rows(&data, &rows).unwrap();
        for i in 0..data.len() {
            assert_eq!(a.predict_proba(data.row(i)), b.predict_proba(data.row(i)));
        }
        assert_eq!(a.gini_decrease, b.gini_decrease);
    }

    #[test]
    fn test_forest_discriminates_signal() {
        let data = noisy_threshold(80);
        let rows: Vec<usize> = (0..data.len()).collect();
        let model = RandomForest::new(
            ForestParams {
                n_trees: 25,
                mtry: 2,
                ..ForestParams::default()
            },
            1,
        )
        .fit_rows(&data, &rows)
        .unwrap();

        let scores: Vec<f64> = rows.iter().map(|&i| model.predict_proba(data.row(i))).collect();
        assert!(scores.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(roc_curve(data.labels(), &scores).unwrap().auc > 0.95);

        let top = model
            .gini_decrease
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(top, Some(0));
    }

    #[test]
    fn test_bootstrap_leaves_out_of_bag_rows() {
        let data = noisy_threshold(50);
        let rows: Vec<usize> = (0..data.len()).collect();
        let model = RandomForest::new(
            ForestParams {
                n_trees: 5,
                ..ForestParams::default()
            },
            3,
        )
        .fit_rows(&data, &rows)
        .unwrap();
        for tree in &model.trees {
            assert_eq!(tree.in_bag.len(), 50);
            let oob = tree.in_bag.iter().filter(|b| !**b).count();
            assert!(oob > 0 && oob < 50);
        }
    }

    #[test]
    fn test_empty_rows_rejected() {
        let data = noisy_threshold(10);
        assert!(RandomForest::new(ForestParams::default(), 1).fit_rows(&data, &[]).is_err());
    }
}
