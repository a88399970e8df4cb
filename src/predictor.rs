//! Fraud scoring against a loaded model artifact

use crate::artifact::ModelArtifact;
use crate::error::{FraudError, Result};
use crate::features::{FeatureRow, FeatureSchema, FeatureValue};
use crate::types::Prediction;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Output columns appended to every scored row
pub const PREDICTION_COLUMNS: [&str; 3] = ["fraud_probability", "is_fraud_predicted", "risk_level"];

/// An input row and its prediction
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub row: FeatureRow,
    pub prediction: Prediction,
}

impl ScoredRow {
    /// The input row with the prediction columns added
    pub fn to_output_row(&self) -> FeatureRow {
        let mut out = self.row.clone();
        out.insert(
            PREDICTION_COLUMNS[0].to_string(),
            FeatureValue::Number(self.prediction.fraud_probability),
        );
        out.insert(
            PREDICTION_COLUMNS[1].to_string(),
            FeatureValue::Flag(self.prediction.is_fraud_predicted),
        );
        out.insert(
            PREDICTION_COLUMNS[2].to_string(),
            FeatureValue::from(self.prediction.risk_level.as_str()),
        );
        out
    }
}

/// Scores feature rows with an immutable, shared artifact.
///
/// Cloning is cheap and clones share the artifact. Picking up a newly
/// trained model means building a new predictor.
#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: Arc<ModelArtifact>,
}

impl Predictor {
    /// Load the artifact bundle from `models_dir`
    pub fn load<P: AsRef<Path>>(models_dir: P) -> Result<Self> {
        let artifact = ModelArtifact::load(models_dir)?;
        let metadata = artifact.metadata();
        info!(
            artifact_id = %metadata.artifact_id,
            trained_at = %metadata.trained_at,
            auc_roc = metadata.auc_roc,
            features = metadata.schema.len(),
            "Predictor initialized"
        );
        Ok(Self::from_artifact(artifact))
    }

    /// Load the artifact bundle and require it to have been fitted on
    /// `expected`, typically the schema selected by `model.features`.
    pub fn load_checked<P: AsRef<Path>>(models_dir: P, expected: &FeatureSchema) -> Result<Self> {
        let artifact = ModelArtifact::load(models_dir)?;
        expected.ensure_matches(artifact.schema())?;
        let predictor = Self::from_artifact(artifact);
        info!(
            artifact_id = %predictor.artifact.id(),
            features = expected.len(),
            "Predictor initialized"
        );
        Ok(predictor)
    }

    pub fn from_artifact(artifact: impl Into<Arc<ModelArtifact>>) -> Self {
        Self {
            artifact: artifact.into(),
        }
    }

    pub fn artifact(&self) -> &Arc<ModelArtifact> {
        &self.artifact
    }

    /// Score one engineered feature row.
    ///
    /// Every schema column must be present; unseen categories are scored in
    /// the unknown bucket and reported on the prediction.
    pub fn predict_one(&self, row: &FeatureRow) -> Result<Prediction> {
        let transformed = self.artifact.transform().transform(row)?;
        for w in &transformed.warnings {
            warn!(
                column = %w.column,
                value = ?w.value,
                code = w.code,
                "Unseen category scored as unknown"
            );
        }

        let probability = self.artifact.classifier().predict_proba(&transformed.values)?;
        let prediction = Prediction::from_probability(probability).with_warnings(transformed.warnings);

        debug!(
            fraud_probability = prediction.fraud_probability,
            risk_level = %prediction.risk_level,
            "Row scored"
        );
        Ok(prediction)
    }

    /// Score rows independently. Fails on the first row that cannot be
    /// scored, naming its position.
    pub fn predict_batch(&self, rows: &[FeatureRow]) -> Result<Vec<ScoredRow>> {
        let scored = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                self.predict_one(row)
                    .map(|prediction| ScoredRow {
                        row: row.clone(),
                        prediction,
                    })
                    .map_err(|e| match e {
                        FraudError::SchemaMismatch(msg) => {
                            FraudError::SchemaMismatch(format!("row {idx}: {msg}"))
                        }
                        other => other,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let flagged = scored.iter().filter(|s| s.prediction.is_fraud_predicted).count();
        info!(rows = scored.len(), flagged, "Batch scored");
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::features::LabeledRows;
    use crate::training::Trainer;
    use crate::types::RiskTier;

    fn row(amount: f64, category: &str) -> FeatureRow {
        let mut row = FeatureRow::new();
        row.insert("amount".to_string(), FeatureValue::Number(amount));
        row.insert("merchant_category".to_string(), FeatureValue::from(category));
        row
    }

    fn predictor() -> Predictor {
        let mut data = LabeledRows::default();
        for i in 0..300 {
            let fraud = i % 10 == 0;
            let amount = if fraud { 3000.0 + i as f64 } else { 10.0 + (i % 40) as f64 };
            data.transaction_ids.push(format!("TXN_{i:06}"));
            data.rows.push(row(amount, if fraud { "online" } else { "grocery" }));
            data.labels.push(fraud);
        }

        let config = ModelConfig {
            n_estimators: 10,
            max_depth: 5,
            min_samples_split: 4,
            min_samples_leaf: 2,
            features: vec!["amount".to_string(), "merchant_category".to_string()],
            ..ModelConfig::default()
        };
        let outcome = Trainer::new(&config).unwrap().train(&data).unwrap();
        Predictor::from_artifact(outcome.artifact)
    }

    #[test]
    fn test_predictions_are_idempotent() {
        let predictor = predictor();
        let input = row(500.0, "online");
        let first = predictor.predict_one(&input).unwrap();
        for _ in 0..5 {
            assert_eq!(predictor.predict_one(&input).unwrap(), first);
        }
    }

    #[test]
    fn test_probability_range_and_label_rule() {
        let predictor = predictor();
        for amount in [0.0, 15.0, 200.0, 1500.0, 4000.0, 1e6] {
            let p = predictor.predict_one(&row(amount, "grocery")).unwrap();
            assert!((0.0..=1.0).contains(&p.fraud_probability));
            assert_eq!(p.is_fraud_predicted, p.fraud_probability > 0.5);
            assert_eq!(p.risk_level, RiskTier::from_probability(p.fraud_probability));
        }

        assert!(predictor.predict_one(&row(4000.0, "online")).unwrap().is_fraud_predicted);
        assert!(!predictor.predict_one(&row(20.0, "grocery")).unwrap().is_fraud_predicted);
    }

    #[test]
    fn test_unseen_category_is_warning_not_error() {
        let predictor = predictor();
        let p = predictor.predict_one(&row(20.0, "crypto_exchange")).unwrap();
        assert_eq!(p.warnings.len(), 1);
        assert_eq!(p.warnings[0].column, "merchant_category");
        assert_eq!(p.warnings[0].code, 2);
    }

    #[test]
    fn test_missing_feature_names_row() {
        let predictor = predictor();
        let mut incomplete = FeatureRow::new();
        incomplete.insert("amount".to_string(), FeatureValue::Number(1.0));

        let err = predictor
            .predict_batch(&[row(1.0, "grocery"), incomplete])
            .unwrap_err();
        assert!(matches!(err, FraudError::SchemaMismatch(ref msg) if msg.starts_with("row 1")));
    }

    #[test]
    fn test_batch_output_columns() {
        let predictor = predictor();
        let scored = predictor
            .predict_batch(&[row(20.0, "grocery"), row(4000.0, "online")])
            .unwrap();
        assert_eq!(scored.len(), 2);

        let out = scored[1].to_output_row();
        for column in PREDICTION_COLUMNS {
            assert!(out.contains_key(column));
        }
        assert_eq!(out["amount"], FeatureValue::Number(4000.0));
        assert_eq!(
            out["risk_level"],
            FeatureValue::from(scored[1].prediction.risk_level.as_str())
        );
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            Predictor::load(tmp.path()),
            Err(FraudError::ArtifactNotFound { .. })
        ));
    }

    #[test]
    fn test_changed_feature_list_rejects_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("models");
        let artifact = predictor().artifact().clone();
        artifact.save(&dir, None).unwrap();

        let trained = artifact.schema().clone();
        assert!(Predictor::load_checked(&dir, &trained).is_ok());

        let changed =
            FeatureSchema::from_columns(&["amount".to_string(), "hour_of_day".to_string()]).unwrap();
        let err = Predictor::load_checked(&dir, &changed).unwrap_err();
        assert!(matches!(err, FraudError::SchemaMismatch(_)));
        assert!(err.hint().unwrap().contains("retrain"));
    }

    #[test]
    fn test_predictor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Predictor>();
    }
}
