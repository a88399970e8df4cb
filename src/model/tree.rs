//! Weighted binary classification tree

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth of tree
    pub max_depth: usize,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Features considered per split
    pub max_features: usize,
}

/// Tree node, stored in a flat arena. Children always sit at higher indices
/// than their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        /// Weighted share of fraud rows that reached this leaf
        fraud_probability: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        n_samples: usize,
    },
}

/// Borrowed training data: row-major features, labels and per-row weights
pub(crate) struct TrainingView<'a> {
    pub features: &'a [Vec<f64>],
    pub labels: &'a [bool],
    pub weights: &'a [f64],
}

/// Decision tree model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    child_impurity: f64,
}

struct Grower<'a, 'v> {
    config: &'a TreeConfig,
    data: &'a TrainingView<'v>,
    n_features: usize,
    nodes: Vec<TreeNode>,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `sample` (duplicates allowed).
    ///
    /// Returns the tree and its unnormalised impurity-decrease importances.
    pub(crate) fn fit(
        config: &TreeConfig,
        data: &TrainingView<'_>,
        sample: &mut [usize],
        rng: &mut ChaCha8Rng,
    ) -> (Self, Vec<f64>) {
        let n_features = data.features.first().map(Vec::len).unwrap_or(0);
        let mut grower = Grower {
            config,
            data,
            n_features,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        grower.grow(sample, 0, rng);

        (Self { nodes: grower.nodes }, grower.importances)
    }

    /// Fraud probability of the leaf `features` falls into
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf {
                    fraud_probability, ..
                } => return *fraud_probability,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Structural check for deserialized trees: traversal must terminate
    /// inside the arena and only read features below `n_features`.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf {
                    fraud_probability, ..
                } => {
                    if !(0.0..=1.0).contains(fraud_probability) {
                        return Err(format!("leaf {idx} has probability {fraud_probability}"));
                    }
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {idx} splits on feature {feature} of {n_features}"));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {idx} has a NaN threshold"));
                    }
                    for child in [left, right] {
                        if *child <= idx || *child >= self.nodes.len() {
                            return Err(format!("node {idx} points to invalid child {child}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Grower<'_, '_> {
    fn grow(&mut self, indices: &mut [usize], depth: usize, rng: &mut ChaCha8Rng) -> usize {
        let (pos_mass, neg_mass) = self.class_mass(indices);
        let impurity = gini(pos_mass, neg_mass);
        let n = indices.len();

        if depth >= self.config.max_depth
            || n < self.config.min_samples_split
            || n < self.config.min_samples_leaf.saturating_mul(2)
            || impurity < 1e-12
        {
            return self.push_leaf(pos_mass, neg_mass, n);
        }

        let parent_impurity = (pos_mass + neg_mass) * impurity;
        let Some(split) = self.best_split(indices, parent_impurity, rng) else {
            return self.push_leaf(pos_mass, neg_mass, n);
        };

        self.importances[split.feature] += parent_impurity - split.child_impurity;

        let features = self.data.features;
        let mid = partition(indices, |i| features[i][split.feature] <= split.threshold);

        let node_idx = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            fraud_probability: 0.0,
            n_samples: n,
        });

        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = self.grow(left_indices, depth + 1, rng);
        let right = self.grow(right_indices, depth + 1, rng);

        self.nodes[node_idx] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            n_samples: n,
        };
        node_idx
    }

    fn push_leaf(&mut self, pos_mass: f64, neg_mass: f64, n_samples: usize) -> usize {
        let total = pos_mass + neg_mass;
        let fraud_probability = if total > 0.0 { pos_mass / total } else { 0.0 };
        self.nodes.push(TreeNode::Leaf {
            fraud_probability,
            n_samples,
        });
        self.nodes.len() - 1
    }

    fn class_mass(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(pos, neg), &i| {
            if self.data.labels[i] {
                (pos + self.data.weights[i], neg)
            } else {
                (pos, neg + self.data.weights[i])
            }
        })
    }

    /// Lowest weighted child impurity over a random subset of features.
    ///
    /// Constant features do not count towards `max_features`.
    fn best_split(
        &self,
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let mut candidates: Vec<usize> = (0..self.n_features).collect();
        candidates.shuffle(rng);

        let (total_pos, total_neg) = self.class_mass(indices);
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf;

        let mut best: Option<SplitCandidate> = None;
        let mut best_impurity = parent_impurity - 1e-12;
        let mut visited = 0;

        for feature in candidates {
            if visited >= self.config.max_features {
                break;
            }

            let mut order: Vec<(f64, usize)> = indices
                .iter()
                .map(|&i| (self.data.features[i][feature], i))
                .collect();
            order.sort_by(|a, b| a.0.total_cmp(&b.0));

            if order[0].0 == order[n - 1].0 {
                continue;
            }
            visited += 1;

            let mut left_pos = 0.0;
            let mut left_neg = 0.0;

            for pos in 0..n - 1 {
                let (value, i) = order[pos];
                if self.data.labels[i] {
                    left_pos += self.data.weights[i];
                } else {
                    left_neg += self.data.weights[i];
                }

                let next = order[pos + 1].0;
                if value == next {
                    continue;
                }

                let left_count = pos + 1;
                if left_count < min_leaf || n - left_count < min_leaf {
                    continue;
                }

                let right_pos = total_pos - left_pos;
                let right_neg = total_neg - left_neg;
                let child_impurity = (left_pos + left_neg) * gini(left_pos, left_neg)
                    + (right_pos + right_neg) * gini(right_pos, right_neg);

                if child_impurity < best_impurity {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best_impurity = child_impurity;
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        child_impurity,
                    });
                }
            }
        }

        best
    }
}

/// Gini impurity of weighted class masses
fn gini(pos: f64, neg: f64) -> f64 {
    let total = pos + neg;
    if total <= 0.0 {
        return 0.0;
    }
    let p = pos / total;
    let q = neg / total;
    1.0 - p * p - q * q
}

/// Move entries matching `pred` to the front; returns how many matched
fn partition<F>(indices: &mut [usize], pred: F) -> usize
where
    F: Fn(usize) -> bool,
{
    let mut mid = 0;
    for j in 0..indices.len() {
        if pred(indices[j]) {
            indices.swap(mid, j);
            mid += 1;
        }
    }
    mid
}
