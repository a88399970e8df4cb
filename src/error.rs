//! Error taxonomy for the fraud detection platform

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FraudError>;

/// Errors surfaced by the feature pipeline, trainer, artifact store and predictor.
#[derive(Debug, Error)]
pub enum FraudError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("no trained model artifact found in {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("model artifact in {} is inconsistent: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("training error: {0}")]
    Training(String),

    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("raw data not found: {}", path.display())]
    DataNotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FraudError {
    /// Corrective action to show next to a user-facing failure.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            FraudError::ArtifactNotFound { .. } => {
                Some("run `fraud-detection-platform train` first to produce a model artifact")
            }
            FraudError::ArtifactCorrupt { .. } => {
                Some("the artifact files disagree; retrain to write a consistent bundle")
            }
            FraudError::SchemaMismatch(_) => Some(
                "make sure the input carries every feature the model was trained on, \
                 or retrain after changing `model.features`",
            ),
            FraudError::DataNotFound { .. } => {
                Some("run `fraud-detection-platform generate` to create the raw tables")
            }
            FraudError::Config(_) => Some("check config/config.toml and FRAUD__* overrides"),
            FraudError::Training(_) => {
                Some("the training data needs both fraud and legitimate transactions")
            }
            _ => None,
        }
    }
}

/// A categorical value that was not part of the fitted vocabulary.
///
/// Non-fatal: the value is mapped to the unknown bucket and the warning
/// travels with the prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnseenCategoryWarning {
    pub column: String,
    pub value: Option<String>,
    pub code: u32,
}

impl fmt::Display for UnseenCategoryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(
                f,
                "unseen value {:?} in column {} mapped to unknown code {}",
                value, self.column, self.code
            ),
            None => write!(
                f,
                "missing value in column {} mapped to unknown code {}",
                self.column, self.code
            ),
        }
    }
}
