//! CART classification tree builder
//!
//! Exact-greedy Gini splits over a random subset of `mtry` features per
//! node. Nodes live in a flat vector; children are indices into it.

use crate::model::Dataset;
use rand::rngs::StdRng;
use rand::seq::index;
use std::cmp::Ordering;

/// Growth limits for a single tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    /// Features considered at each split (clamped to the feature count)
    pub mtry: usize,
    pub min_samples_leaf: usize,
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            mtry: 3,
            min_samples_leaf: 1,
            max_depth: Some(40),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Leaf {
        /// Share of Hit among the bootstrap samples reaching this leaf
        hit_share: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        /// Rows with value <= threshold go left
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted classification tree
#[derive(Clone, Debug, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Hit share of the leaf `row` falls into
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { hit_share, .. } => return *hit_share,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }
}

/// Best split found at a node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Weighted Gini decrease: n*G(parent) - nl*G(left) - nr*G(right)
    decrease: f64,
}

fn gini(hits: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = hits as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

/// Grows one tree over a (possibly repeated) sample of row indices
pub struct TreeBuilder<'a> {
    data: &'a Dataset,
    config: TreeConfig,
    /// Total Gini decrease credited to each feature
    gini_decrease: Vec<f64>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(data: &'a Dataset, config: TreeConfig) -> Self {
        Self {
            data,
            config,
            gini_decrease: vec![0.0; data.n_features()],
        }
    }

    /// Build the tree, returning it with per-feature Gini decrease
    pub fn build(mut self, samples: &[usize], rng: &mut StdRng) -> (DecisionTree, Vec<f64>) {
        let mut nodes = Vec::new();
        let mut indices = samples.to_vec();
        self.build_node(&mut indices, 0, &mut nodes, rng);
        (DecisionTree { nodes }, self.gini_decrease)
    }

    fn build_node(&mut self, indices: &mut [usize], depth: usize, nodes: &mut Vec<Node>, rng: &mut StdRng) -> usize {
        let current = nodes.len();
        let n = indices.len();
        let hits = indices.iter().filter(|&&i| self.data.label(i)).count();
        let leaf = Node::Leaf {
            hit_share: if n == 0 { 0.0 } else { hits as f64 / n as f64 },
            samples: n,
        };

        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if hits == 0 || hits == n || n < 2 * self.config.min_samples_leaf || depth_reached {
            nodes.push(leaf);
            return current;
        }

        let Some(split) = self.find_best_split(indices, hits, rng) else {
            nodes.push(leaf);
            return current;
        };

        // Reserve this node, then partition in place
        nodes.push(Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: 0,
            right: 0,
        });
        self.gini_decrease[split.feature] += split.decrease;

        let mid = partition(indices, |i| self.data.row(i)[split.feature] <= split.threshold);
        let (left_rows, right_rows) = indices.split_at_mut(mid);
        let left = self.build_node(left_rows, depth + 1, nodes, rng);
        let right = self.build_node(right_rows, depth + 1, nodes, rng);

        if let Node::Split {
            left: l, right: r, ..
        } = &mut nodes[current]
        {
            *l = left;
            *r = right;
        }
        current
    }

    fn find_best_split(&self, indices: &[usize], hits: usize, rng: &mut StdRng) -> Option<SplitCandidate> {
        let d = self.data.n_features();
        let mtry = self.config.mtry.clamp(1, d);
        let n = indices.len();
        let parent = n as f64 * gini(hits, n);
        let min_leaf = self.config.min_samples_leaf.max(1);

        let mut best: Option<SplitCandidate> = None;
        let mut sorted: Vec<(f64, bool)> = Vec::with_capacity(n);

        for feature in index::sample(rng, d, mtry).into_iter() {
            sorted.clear();
            sorted.extend(indices.iter().map(|&i| (self.data.row(i)[feature], self.data.label(i))));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_hits = 0;
            for k in 0..n - 1 {
                if sorted[k].1 {
                    left_hits += 1;
                }
                let left_n = k + 1;
                let right_n = n - left_n;
                // Only split between distinct values
                if sorted[k].0.total_cmp(&sorted[k + 1].0) == Ordering::Equal {
                    continue;
                }
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let decrease = parent
                    - left_n as f64 * gini(left_hits, left_n)
                    - right_n as f64 * gini(hits - left_hits, right_n);
                if decrease <= 1e-12 {
                    continue;
                }

                let better = match best {
                    None => true,
                    Some(current) => {
                        decrease > current.decrease
                            || (decrease == current.decrease && feature < current.feature)
                    }
                };
                if better {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (sorted[k].0 + sorted[k + 1].0) / 2.0,
                        decrease,
                    });
                }
            }
        }

        best
    }
}

/// Reorder so elements satisfying `pred` come first; returns their count
fn partition(items: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut next = 0;
    for i in 0..items.len() {
        if pred(items[i]) {
            items.swap(next, i);
            next += 1;
        }
    }
    next
}
