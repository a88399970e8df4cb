//! Random forest classifier with balanced class weights

use crate::config::ModelConfig;
use crate::error::{FraudError, Result};
use crate::model::tree::{DecisionTree, TrainingView, TreeConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How rows are weighted when measuring impurity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// Each class weighted by `n / (2 * n_class)`
    Balanced,
    /// Every row weighs 1
    Uniform,
}

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` means sqrt of the feature count
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub class_weight: ClassWeight,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 10,
            min_samples_leaf: 5,
            max_features: None,
            bootstrap: true,
            class_weight: ClassWeight::Balanced,
            seed: 42,
        }
    }
}

impl From<&ModelConfig> for ForestConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features,
            seed: config.random_state,
            ..Self::default()
        }
    }
}

impl ForestConfig {
    fn tree_config(&self, n_features: usize) -> TreeConfig {
        let max_features = self
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().round() as usize)
            .clamp(1, n_features.max(1));
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features,
        }
    }
}

/// Trained random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    n_features: usize,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Fit a forest on a row-major feature matrix.
    ///
    /// Tree `i` draws its bootstrap sample and feature subsets from a
    /// ChaCha8 stream seeded with `seed + i`, so a fixed seed reproduces the
    /// same forest.
    pub fn fit(config: ForestConfig, features: &[Vec<f64>], labels: &[bool]) -> Result<Self> {
        if features.is_empty() {
            return Err(FraudError::Training("no training rows".to_string()));
        }
        if features.len() != labels.len() {
            return Err(FraudError::Training(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        let n_features = features[0].len();
        if n_features == 0 {
            return Err(FraudError::Training("feature rows are empty".to_string()));
        }
        if let Some(idx) = features.iter().position(|row| row.len() != n_features) {
            return Err(FraudError::SchemaMismatch(format!(
                "training row {idx} has {} values, expected {n_features}",
                features[idx].len()
            )));
        }
        if config.n_estimators == 0 {
            return Err(FraudError::Training("n_estimators must be at least 1".to_string()));
        }

        let weights = row_weights(labels, config.class_weight)?;
        let data = TrainingView {
            features,
            labels,
            weights: &weights,
        };
        let tree_config = config.tree_config(n_features);
        let n = features.len();

        let mut trees = Vec::with_capacity(config.n_estimators);
        let mut importances = vec![0.0; n_features];

        for i in 0..config.n_estimators {
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(i as u64));
            let mut sample: Vec<usize> = if config.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };

            let (tree, tree_importances) = DecisionTree::fit(&tree_config, &data, &mut sample, &mut rng);
            let total: f64 = tree_importances.iter().sum();
            if total > 0.0 {
                for (acc, value) in importances.iter_mut().zip(&tree_importances) {
                    *acc += value / total;
                }
            }
            debug!(tree = i, nodes = tree.nodes().len(), depth = tree.depth(), "Tree fitted");
            trees.push(tree);
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for value in &mut importances {
                *value /= total;
            }
        }

        Ok(Self {
            config,
            n_features,
            trees,
            feature_importances: importances,
        })
    }

    /// Mean of the trees' leaf fraud probabilities, in [0, 1]
    pub fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features {
            return Err(FraudError::SchemaMismatch(format!(
                "model expects {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        if self.trees.is_empty() {
            return Ok(0.0);
        }

        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(features)).sum();
        Ok((sum / self.trees.len() as f64).clamp(0.0, 1.0))
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Normalised mean impurity decrease per feature
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Structural check after deserialization
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.feature_importances.len() != self.n_features {
            return Err(format!(
                "{} importances for {} features",
                self.feature_importances.len(),
                self.n_features
            ));
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|reason| format!("tree {idx}: {reason}"))?;
        }
        Ok(())
    }
}

/// Per-class weights as `(legitimate, fraud)`
pub fn class_weights(labels: &[bool], mode: ClassWeight) -> Result<(f64, f64)> {
    let n = labels.len();
    let n_fraud = labels.iter().filter(|&&l| l).count();
    let n_legit = n - n_fraud;
    if n_fraud == 0 || n_legit == 0 {
        return Err(FraudError::Training(format!(
            "training labels contain a single class ({n_fraud} fraud, {n_legit} legitimate)"
        )));
    }

    Ok(match mode {
        ClassWeight::Balanced => (
            n as f64 / (2.0 * n_legit as f64),
            n as f64 / (2.0 * n_fraud as f64),
        ),
        ClassWeight::Uniform => (1.0, 1.0),
    })
}

fn row_weights(labels: &[bool], mode: ClassWeight) -> Result<Vec<f64>> {
    let (legit, fraud) = class_weights(labels, mode)?;
    Ok(labels.iter().map(|&l| if l { fraud } else { legit }).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fraud when the first feature is large; a few noisy columns besides
    fn dataset(n: usize) -> (Vec<Vec<f64>>, Vec<bool>) {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut features = Vec::with_capacity(n);
        let mut labels = Vec::with_capacity(n);
        for i in 0..n {
            let fraud = i % 10 == 0;
            let signal = if fraud {
                rng.gen_range(3.0..5.0)
            } else {
                rng.gen_range(-1.0..2.0)
            };
            features.push(vec![signal, rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)]);
            labels.push(fraud);
        }
        (features, labels)
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_estimators: 10,
            max_depth: 4,
            min_samples_split: 4,
            min_samples_leaf: 2,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn test_balanced_weights() {
        let labels: Vec<bool> = (0..100).map(|i| i < 5).collect();
        let (legit, fraud) = class_weights(&labels, ClassWeight::Balanced).unwrap();
        assert!((legit - 100.0 / 190.0).abs() < 1e-12);
        assert!((fraud - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_is_training_error() {
        let features = vec![vec![1.0]; 4];
        let labels = vec![false; 4];
        assert!(matches!(
            RandomForest::fit(small_config(), &features, &labels),
            Err(FraudError::Training(_))
        ));
    }

    #[test]
    fn test_forest_learns_signal() {
        let (features, labels) = dataset(400);
        let forest = RandomForest::fit(small_config(), &features, &labels).unwrap();

        assert_eq!(forest.n_trees(), 10);
        assert!(forest.validate().is_ok());
        assert!(forest.predict_proba(&[4.0, 0.0, 0.0]).unwrap() > 0.8);
        assert!(forest.predict_proba(&[0.0, 0.0, 0.0]).unwrap() < 0.2);

        let importances = forest.feature_importances();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[0] > importances[1]);
        assert!(importances[0] > importances[2]);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (features, labels) = dataset(200);
        let a = RandomForest::fit(small_config(), &features, &labels).unwrap();
        let b = RandomForest::fit(small_config(), &features, &labels).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_probability_bounds_and_width_check() {
        let (features, labels) = dataset(200);
        let forest = RandomForest::fit(small_config(), &features, &labels).unwrap();

        for row in &features {
            let p = forest.predict_proba(row).unwrap();
            assert!((0.0..=1.0).contains(&p));
        }
        assert!(matches!(
            forest.predict_proba(&[1.0]),
            Err(FraudError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_default_max_features_is_sqrt() {
        let config = ForestConfig::default();
        assert_eq!(config.tree_config(12).max_features, 3);
        assert_eq!(config.tree_config(1).max_features, 1);
    }
}
