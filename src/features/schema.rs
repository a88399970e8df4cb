//! Versioned feature schema shared by training and inference

use crate::error::{FraudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Bumped whenever a column is added, removed or changes meaning.
/// Artifacts fitted under another version must be retrained.
pub const FEATURE_SCHEMA_VERSION: u32 = 2;

/// Every column the feature builder can produce, in canonical order
pub const KNOWN_FEATURES: [&str; 12] = [
    "amount",
    "hour_of_day",
    "day_of_week",
    "customer_age",
    "transaction_frequency",
    "amount_zscore",
    "is_night_transaction",
    "is_weekend_transaction",
    "is_amount_outlier",
    "merchant_risk_score",
    "is_high_risk_merchant",
    "merchant_category",
];

/// Columns that hold text and go through the category encoder
pub const CATEGORICAL_FEATURES: [&str; 1] = ["merchant_category"];

/// Ordered list of feature columns a model is fitted on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    version: u32,
    columns: Vec<String>,
}

impl FeatureSchema {
    /// All known features in canonical order
    pub fn standard() -> Self {
        Self {
            version: FEATURE_SCHEMA_VERSION,
            columns: KNOWN_FEATURES.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Schema over a configured subset of the known features.
    ///
    /// Unknown, duplicated or empty column lists are configuration errors.
    pub fn from_columns(columns: &[String]) -> Result<Self> {
        if columns.is_empty() {
            return Err(FraudError::Config(
                "feature list must name at least one column".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for column in columns {
            if !KNOWN_FEATURES.contains(&column.as_str()) {
                return Err(FraudError::Config(format!(
                    "unknown feature column {:?}; known columns: {}",
                    column,
                    KNOWN_FEATURES.join(", ")
                )));
            }
            if !seen.insert(column.as_str()) {
                return Err(FraudError::Config(format!(
                    "feature column {:?} listed twice",
                    column
                )));
            }
        }

        Ok(Self {
            version: FEATURE_SCHEMA_VERSION,
            columns: columns.to_vec(),
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn is_categorical(column: &str) -> bool {
        CATEGORICAL_FEATURES.contains(&column)
    }

    /// Names of the numeric matrix columns after encoding
    pub fn matrix_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| {
                if Self::is_categorical(c) {
                    format!("{c}_encoded")
                } else {
                    c.clone()
                }
            })
            .collect()
    }

    /// Categorical columns present in this schema
    pub fn categorical_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| Self::is_categorical(c))
    }

    /// Fail unless the schema equals `other` exactly (version and order).
    /// `self` is the expected schema, `other` the one a model was fitted on.
    pub fn ensure_matches(&self, other: &FeatureSchema) -> Result<()> {
        if self.version != other.version {
            return Err(FraudError::SchemaMismatch(format!(
                "feature schema version {} does not match expected version {}",
                other.version, self.version
            )));
        }
        if self.columns != other.columns {
            return Err(FraudError::SchemaMismatch(format!(
                "configured columns [{}] differ from the model's [{}]",
                self.columns.join(", "),
                other.columns.join(", ")
            )));
        }
        Ok(())
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::standard()
    }
}
