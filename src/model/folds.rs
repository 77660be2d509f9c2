//! Seeded k-fold partition shared by every model
//!
//! Rows are shuffled once with the run seed and dealt round-robin into
//! folds, so every row is held out exactly once and fold sizes differ by at
//! most one.

use crate::error::{HitlabError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Derive an independent seed for a sub-stream (fold, tree, feature).
///
/// SplitMix64 finaliser over `seed ^ stream`; stable across platforms.
pub fn derive_seed(seed: u64, stream: u64) -> u64 {
    let mut z = (seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Fold assignment for `n` rows
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoldPlan {
    k: usize,
    assignment: Vec<usize>,
}

impl FoldPlan {
    pub fn new(n: usize, k: usize, seed: u64) -> Result<Self> {
        if k < 2 {
            return Err(HitlabError::ConfigError(format!("need at least 2 folds, got {}", k)));
        }
        if n < k {
            return Err(HitlabError::InsufficientData {
                context: "cross-validation".into(),
                reason: format!("{} rows cannot fill {} folds", n, k),
            });
        }

        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let mut assignment = vec![0; n];
        for (position, &row) in order.iter().enumerate() {
            assignment[row] = position % k;
        }

        Ok(Self { k, assignment })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    /// Held-out rows of `fold`, ascending
    pub fn test_rows(&self, fold: usize) -> Vec<usize> {
        (0..self.assignment.len())
            .filter(|&r| self.assignment[r] == fold)
            .collect()
    }

    /// Training rows of `fold` (everything else), ascending
    pub fn train_rows(&self, fold: usize) -> Vec<usize> {
        (0..self.assignment.len())
            .filter(|&r| self.assignment[r] != fold)
            .collect()
    }
}
