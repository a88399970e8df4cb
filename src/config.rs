//! Configuration management for the fraud detection platform

use crate::error::{FraudError, Result};
use crate::features::schema::FeatureSchema;
use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub data_generation: GenerationConfig,
    pub model: ModelConfig,
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
}

/// Synthetic data generation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Number of transactions to generate
    pub n_transactions: usize,
    /// Number of customers in the reference table
    pub n_customers: usize,
    /// Number of merchants in the reference table
    pub n_merchants: usize,
    /// Share of transactions labelled fraudulent
    pub fraud_rate: f64,
    /// First day of the generated date range
    pub start_date: NaiveDate,
    /// Last day of the generated date range
    pub end_date: NaiveDate,
    /// Seed for the generator RNG
    pub seed: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            n_transactions: 10_000,
            n_customers: 1_000,
            n_merchants: 500,
            fraud_rate: 0.05,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            seed: 42,
        }
    }
}

/// Model training settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Seed for the split and the forest
    pub random_state: u64,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum rows required to split a node
    pub min_samples_split: usize,
    /// Minimum rows in each leaf
    pub min_samples_leaf: usize,
    /// Features tried per split (sqrt of the feature count when unset)
    pub max_features: Option<usize>,
    /// Ordered feature columns the model is fitted on
    pub features: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 10,
            min_samples_leaf: 5,
            max_features: None,
            features: FeatureSchema::standard().columns().to_vec(),
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding transactions.csv, customers.csv and merchants.csv
    pub raw_data_dir: PathBuf,
    /// Directory holding the model artifact bundle
    pub models_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_data_dir: PathBuf::from("data/raw"),
            models_dir: PathBuf::from("data/models"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path, with `FRAUD__SECTION__KEY`
    /// environment overrides applied on top.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FraudError::Config(format!(
                "configuration file {} does not exist",
                path.display()
            )));
        }
        Self::build(path, true)
    }

    /// Like [`AppConfig::load_from_path`], but a missing file means defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(path.as_ref(), false)
    }

    fn build(path: &Path, required: bool) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).required(required))
            .add_source(
                Environment::with_prefix("FRAUD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| FraudError::Config(format!("failed to build configuration: {e}")))?;

        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| FraudError::Config(format!("failed to deserialize configuration: {e}")))?;

        app.validate()?;
        Ok(app)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let generation = &self.data_generation;
        if !(0.0..=1.0).contains(&generation.fraud_rate) {
            return Err(FraudError::Config(format!(
                "data_generation.fraud_rate must be within [0, 1], got {}",
                generation.fraud_rate
            )));
        }
        if generation.start_date > generation.end_date {
            return Err(FraudError::Config(format!(
                "data_generation.start_date {} is after end_date {}",
                generation.start_date, generation.end_date
            )));
        }
        if generation.n_customers == 0 || generation.n_merchants == 0 {
            return Err(FraudError::Config(
                "data_generation needs at least one customer and one merchant".to_string(),
            ));
        }

        let model = &self.model;
        if !(model.test_size > 0.0 && model.test_size < 1.0) {
            return Err(FraudError::Config(format!(
                "model.test_size must be within (0, 1), got {}",
                model.test_size
            )));
        }
        if model.n_estimators == 0 {
            return Err(FraudError::Config(
                "model.n_estimators must be at least 1".to_string(),
            ));
        }
        if model.max_depth == 0 || model.min_samples_leaf == 0 || model.min_samples_split < 2 {
            return Err(FraudError::Config(
                "model.max_depth and model.min_samples_leaf must be >= 1, \
                 model.min_samples_split must be >= 2"
                    .to_string(),
            ));
        }
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(FraudError::Config(format!(
                "logging.level must be one of trace, debug, info, warn, error; got {:?}",
                self.logging.level
            )));
        }
        if !["pretty", "json"].contains(&self.logging.format.as_str()) {
            return Err(FraudError::Config(format!(
                "logging.format must be pretty or json, got {:?}",
                self.logging.format
            )));
        }
        if model.max_features == Some(0) {
            return Err(FraudError::Config(
                "model.max_features must be at least 1 when set".to_string(),
            ));
        }

        self.feature_schema()?;
        Ok(())
    }

    /// Feature schema selected by `model.features`
    pub fn feature_schema(&self) -> Result<FeatureSchema> {
        FeatureSchema::from_columns(&self.model.features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.model.test_size, 0.2);
        assert_eq!(config.model.n_estimators, 100);
        assert_eq!(config.model.features.len(), 12);
        assert_eq!(config.paths.models_dir, PathBuf::from("data/models"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_ignores_unknown_keys() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[model]
test_size = 0.25
n_estimators = 20
mlflow_tracking = "file:./mlruns"

[data_generation]
start_date = "2023-06-01"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.model.test_size, 0.25);
        assert_eq!(config.model.n_estimators, 20);
        assert_eq!(config.model.max_depth, 10);
        assert_eq!(
            config.data_generation.start_date,
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()
        );
    }

    #[test]
    fn test_invalid_test_size_is_config_error() {
        let mut config = AppConfig::default();
        config.model.test_size = 1.5;
        assert!(matches!(config.validate(), Err(FraudError::Config(_))));
    }

    #[test]
    fn test_unknown_feature_is_config_error() {
        let mut config = AppConfig::default();
        config.model.features.push("amount_percentile".to_string());
        assert!(matches!(config.validate(), Err(FraudError::Config(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_or_default("does/not/exist.toml").unwrap();
        assert_eq!(config.model.n_estimators, 100);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_env_override() {
        // keys no other test asserts on, since the environment is process-wide
        std::env::set_var("FRAUD__MODEL__MIN_SAMPLES_SPLIT", "7");
        std::env::set_var("FRAUD__MODEL__RANDOM_STATE", "1234");
        let config = AppConfig::load_or_default("does/not/exist.toml");
        std::env::remove_var("FRAUD__MODEL__MIN_SAMPLES_SPLIT");
        std::env::remove_var("FRAUD__MODEL__RANDOM_STATE");

        let config = config.unwrap();
        assert_eq!(config.model.min_samples_split, 7);
        assert_eq!(config.model.random_state, 1234);
        assert_eq!(config.model.max_depth, 10);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = AppConfig::load_from_path("does/not/exist.toml");
        assert!(matches!(result, Err(FraudError::Config(_))));
    }
}
