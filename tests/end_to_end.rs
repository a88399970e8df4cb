use fraud_detection_platform::artifact::{ModelArtifact, ENCODERS_FILE};
use fraud_detection_platform::config::{AppConfig, GenerationConfig, ModelConfig, PathsConfig};
use fraud_detection_platform::ingestion::RawTables;
use fraud_detection_platform::{pipeline, FeatureRow, FeatureValue, FraudError, Predictor, RiskTier};
use std::fs;
use std::path::Path;

fn config(root: &Path) -> AppConfig {
    AppConfig {
        data_generation: GenerationConfig {
            n_transactions: 3000,
            n_customers: 300,
            n_merchants: 100,
            ..GenerationConfig::default()
        },
        model: ModelConfig {
            n_estimators: 40,
            max_depth: 8,
            ..ModelConfig::default()
        },
        paths: PathsConfig {
            raw_data_dir: root.join("raw"),
            models_dir: root.join("models"),
        },
        ..AppConfig::default()
    }
}

fn high_risk_row() -> FeatureRow {
    let values = [
        ("amount", FeatureValue::Number(1500.0)),
        ("hour_of_day", FeatureValue::Number(2.0)),
        ("day_of_week", FeatureValue::Number(1.0)),
        ("customer_age", FeatureValue::Number(35.0)),
        ("transaction_frequency", FeatureValue::Number(50.0)),
        ("amount_zscore", FeatureValue::Number(2.5)),
        ("is_night_transaction", FeatureValue::Number(1.0)),
        ("is_weekend_transaction", FeatureValue::Number(0.0)),
        ("is_amount_outlier", FeatureValue::Number(1.0)),
        ("merchant_risk_score", FeatureValue::Number(0.8)),
        ("is_high_risk_merchant", FeatureValue::Flag(true)),
        ("merchant_category", FeatureValue::from("online")),
    ];
    values
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[test]
fn test_pipeline_artifact_reproduces_in_process_predictions() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path());

    let outcome = pipeline::run(&config).unwrap();
    assert!(outcome.quality.passed());
    assert!(outcome.training.report.evaluation.auc_roc > 0.8);
    assert_eq!(outcome.training.report.n_test_fraud, 30);

    let predictor = Predictor::load(&config.paths.models_dir).unwrap();
    assert_eq!(predictor.artifact().id(), outcome.training.artifact.id());

    let holdout = &outcome.training.holdout;
    let scored = predictor.predict_batch(&holdout.rows).unwrap();
    for (i, s) in scored.iter().enumerate() {
        assert_eq!(s.prediction.fraud_probability, holdout.probabilities[i]);
        assert_eq!(s.prediction.is_fraud_predicted, holdout.predicted[i]);
    }

    let report = ModelArtifact::load_report(&config.paths.models_dir)
        .unwrap()
        .unwrap();
    assert_eq!(report.artifact_id, predictor.artifact().id());

    let prediction = predictor.predict_one(&high_risk_row()).unwrap();
    assert!(prediction.is_fraud_predicted);
    assert_eq!(prediction.risk_level, RiskTier::High);
    assert!(prediction.warnings.is_empty());

    let mut unseen = high_risk_row();
    unseen.insert("merchant_category".to_string(), FeatureValue::from("crypto_exchange"));
    let prediction = predictor.predict_one(&unseen).unwrap();
    assert_eq!(prediction.warnings.len(), 1);
    assert!((0.0..=1.0).contains(&prediction.fraud_probability));
}

#[test]
fn test_failed_retrain_keeps_previous_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = config(tmp.path());
    config.data_generation.n_transactions = 1000;
    config.model.n_estimators = 10;

    let tables = pipeline::generate(&config).unwrap();
    let first = pipeline::train_on(&tables, &config).unwrap();

    let legit_only = RawTables {
        transactions: tables
            .transactions
            .iter()
            .filter(|t| !t.is_fraud)
            .cloned()
            .collect(),
        ..tables.clone()
    };
    assert!(matches!(
        pipeline::train_on(&legit_only, &config),
        Err(FraudError::Training(_))
    ));

    let loaded = ModelArtifact::load(&config.paths.models_dir).unwrap();
    assert_eq!(loaded.id(), first.artifact.id());
}

#[test]
fn test_missing_artifact_asks_for_training() {
    let tmp = tempfile::tempdir().unwrap();
    let err = Predictor::load(tmp.path().join("models")).unwrap_err();
    assert!(matches!(err, FraudError::ArtifactNotFound { .. }));
    assert!(err.hint().unwrap().contains("train"));
}

#[test]
fn test_partial_artifact_is_corrupt() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = config(tmp.path());
    config.data_generation.n_transactions = 600;
    config.model.n_estimators = 5;

    let tables = pipeline::generate(&config).unwrap();
    pipeline::train_on(&tables, &config).unwrap();
    fs::remove_file(config.paths.models_dir.join(ENCODERS_FILE)).unwrap();

    assert!(matches!(
        Predictor::load(&config.paths.models_dir),
        Err(FraudError::ArtifactCorrupt { .. })
    ));
}

#[test]
fn test_training_without_raw_data_is_data_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path());
    let err = pipeline::train(&config).unwrap_err();
    assert!(matches!(err, FraudError::DataNotFound { .. }));
    assert!(err.hint().unwrap().contains("generate"));
}

#[test]
fn test_changed_feature_config_needs_retrain() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = config(tmp.path());
    config.data_generation.n_transactions = 600;
    config.model.n_estimators = 5;

    let tables = pipeline::generate(&config).unwrap();
    pipeline::train_on(&tables, &config).unwrap();
    let models_dir = &config.paths.models_dir;
    assert!(Predictor::load_checked(models_dir, &config.feature_schema().unwrap()).is_ok());

    config.model.features = vec!["amount".to_string(), "hour_of_day".to_string()];
    let err = Predictor::load_checked(models_dir, &config.feature_schema().unwrap()).unwrap_err();
    assert!(matches!(err, FraudError::SchemaMismatch(_)));
    assert!(err.hint().unwrap().contains("retrain"));
}
