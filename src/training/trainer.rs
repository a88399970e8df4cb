//! Model training: split, fit, evaluate

use crate::artifact::ModelArtifact;
use crate::config::ModelConfig;
use crate::error::{FraudError, Result};
use crate::features::{FeatureRow, FeatureSchema, FeatureTransform, LabeledRows};
use crate::metrics::ClassificationReport;
use crate::model::{ForestConfig, RandomForest};
use crate::training::split::stratified_split;
use crate::types::Prediction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Importance of one feature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Summary of a training run, persisted next to the artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub artifact_id: Uuid,
    pub schema: FeatureSchema,
    pub trained_at: DateTime<Utc>,
    pub n_train: usize,
    pub n_test: usize,
    pub n_train_fraud: usize,
    pub n_test_fraud: usize,
    pub evaluation: ClassificationReport,
    /// Sorted by descending importance
    pub feature_importances: Vec<FeatureImportance>,
}

impl TrainingReport {
    /// Print the split sizes and top features, then the evaluation block
    pub fn print_summary(&self) {
        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              FRAUD MODEL - TRAINING SUMMARY                  ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Artifact: {:<50} ║", self.artifact_id);
        info!(
            "║ Train rows: {:>8} ({:>5} fraud)  │  Test rows: {:>6} ({:>4} fraud) ║",
            self.n_train, self.n_train_fraud, self.n_test, self.n_test_fraud
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Top Features:                                                ║");
        for fi in self.feature_importances.iter().take(10) {
            let bar: String = "█".repeat(((fi.importance * 40.0) as usize).min(20));
            info!("║   {:<24} {:>6.4} {}", fi.feature, fi.importance, bar);
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
        self.evaluation.print_summary();
    }
}

/// Held-out rows with the in-process predictions made on them
#[derive(Debug, Clone, Default)]
pub struct HoldoutSet {
    pub transaction_ids: Vec<String>,
    pub rows: Vec<FeatureRow>,
    pub labels: Vec<bool>,
    pub probabilities: Vec<f64>,
    pub predicted: Vec<bool>,
}

/// Everything a successful training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub report: TrainingReport,
    pub holdout: HoldoutSet,
}

/// Fits a fraud model from labelled feature rows
#[derive(Debug, Clone)]
pub struct Trainer {
    schema: FeatureSchema,
    forest: ForestConfig,
    test_size: f64,
    seed: u64,
}

impl Trainer {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            schema: FeatureSchema::from_columns(&config.features)?,
            forest: ForestConfig::from(config),
            test_size: config.test_size,
            seed: config.random_state,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Split, fit the feature transform and forest on the training
    /// partition, and evaluate on the held-out partition.
    ///
    /// Nothing is written to disk; the caller persists the artifact.
    pub fn train(&self, data: &LabeledRows) -> Result<TrainingOutcome> {
        if data.is_empty() {
            return Err(FraudError::Training("no labelled rows to train on".to_string()));
        }
        let n_fraud = data.fraud_count();
        if n_fraud == 0 {
            return Err(FraudError::Training("training data has no fraud rows".to_string()));
        }
        if n_fraud == data.len() {
            return Err(FraudError::Training(
                "training data has no legitimate rows".to_string(),
            ));
        }

        info!(
            rows = data.len(),
            fraud = n_fraud,
            features = self.schema.len(),
            "Training fraud model"
        );

        let split = stratified_split(&data.labels, self.test_size, self.seed)?;
        let train_rows: Vec<FeatureRow> = split.train.iter().map(|&i| data.rows[i].clone()).collect();
        let train_labels: Vec<bool> = split.train.iter().map(|&i| data.labels[i]).collect();

        let (transform, matrix) = FeatureTransform::fit(self.schema.clone(), &train_rows)?;
        let classifier = RandomForest::fit(self.forest, &matrix, &train_labels)?;
        info!(
            trees = classifier.n_trees(),
            train_rows = train_rows.len(),
            "Random forest fitted"
        );

        let mut holdout = HoldoutSet::default();
        for &i in &split.test {
            let transformed = transform.transform(&data.rows[i])?;
            for warning in &transformed.warnings {
                debug!(row = i, %warning, "Held-out row has unseen category");
            }
            let prediction = Prediction::from_probability(classifier.predict_proba(&transformed.values)?);

            holdout
                .transaction_ids
                .push(data.transaction_ids.get(i).cloned().unwrap_or_default());
            holdout.rows.push(data.rows[i].clone());
            holdout.labels.push(data.labels[i]);
            holdout.probabilities.push(prediction.fraud_probability);
            holdout.predicted.push(prediction.is_fraud_predicted);
        }

        let evaluation =
            ClassificationReport::evaluate(&holdout.labels, &holdout.predicted, &holdout.probabilities);
        info!(auc_roc = evaluation.auc_roc, accuracy = evaluation.accuracy, "Model evaluated");

        let mut feature_importances: Vec<FeatureImportance> = self
            .schema
            .columns()
            .iter()
            .zip(classifier.feature_importances())
            .map(|(feature, &importance)| FeatureImportance {
                feature: feature.clone(),
                importance,
            })
            .collect();
        feature_importances.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        let artifact = ModelArtifact::new(transform, classifier, evaluation.auc_roc, split.train.len())?;

        let report = TrainingReport {
            artifact_id: artifact.id(),
            schema: self.schema.clone(),
            trained_at: artifact.metadata().trained_at,
            n_train: split.train.len(),
            n_test: split.test.len(),
            n_train_fraud: train_labels.iter().filter(|&&l| l).count(),
            n_test_fraud: holdout.labels.iter().filter(|&&l| l).count(),
            evaluation,
            feature_importances,
        };

        Ok(TrainingOutcome {
            artifact,
            report,
            holdout,
        })
    }
}
