//! Fraud Detection Platform Library
//!
//! Synthetic payment data, a shared feature pipeline, a random-forest
//! fraud model with a versioned on-disk artifact, and a predictor that
//! scores single rows or CSV batches.

pub mod analytics;
pub mod artifact;
pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod generator;
pub mod ingestion;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod predictor;
pub mod quality;
pub mod training;
pub mod types;

pub use artifact::ModelArtifact;
pub use config::AppConfig;
pub use error::{FraudError, Result};
pub use features::{FeatureBuilder, FeatureRow, FeatureSchema, FeatureTransform, FeatureValue};
pub use predictor::Predictor;
pub use training::{Trainer, TrainingOutcome};
pub use types::{Prediction, RiskTier, Transaction};
