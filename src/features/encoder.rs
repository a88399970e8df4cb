//! Label encoding for categorical feature columns

use crate::error::{FraudError, Result, UnseenCategoryWarning};
use crate::features::row::FeatureRow;
use crate::features::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Label of the sentinel bucket, for display only
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Fitted vocabulary for one categorical column.
///
/// Codes are the positions of the sorted distinct training values; the
/// unknown sentinel is `classes.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

/// Result of encoding one value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedCategory {
    Known(u32),
    Unknown(u32),
}

impl EncodedCategory {
    pub fn code(&self) -> u32 {
        match self {
            EncodedCategory::Known(code) | EncodedCategory::Unknown(code) => *code,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, EncodedCategory::Unknown(_))
    }
}

impl CategoryEncoder {
    /// Fit on the observed training values
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let classes: BTreeSet<&str> = values.into_iter().collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    /// Encode a value; values never seen during fit map to the sentinel.
    /// Does not touch the vocabulary.
    pub fn encode(&self, value: Option<&str>) -> EncodedCategory {
        match value {
            Some(value) => match self.classes.binary_search_by(|c| c.as_str().cmp(value)) {
                Ok(idx) => EncodedCategory::Known(idx as u32),
                Err(_) => EncodedCategory::Unknown(self.unknown_code()),
            },
            None => EncodedCategory::Unknown(self.unknown_code()),
        }
    }

    pub fn unknown_code(&self) -> u32 {
        self.classes.len() as u32
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Label for a code, `UNKNOWN_CATEGORY` for the sentinel
    pub fn decode(&self, code: u32) -> &str {
        self.classes
            .get(code as usize)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CATEGORY)
    }
}

/// Encoders for every categorical column of a schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderState {
    encoders: BTreeMap<String, CategoryEncoder>,
}

impl EncoderState {
    /// Fit one encoder per categorical schema column on the training rows.
    /// Missing cells are not part of the vocabulary.
    pub fn fit(schema: &FeatureSchema, rows: &[FeatureRow]) -> Self {
        let encoders = schema
            .categorical_columns()
            .map(|column| {
                let labels: Vec<String> = rows
                    .iter()
                    .filter_map(|row| row.get(column).and_then(|v| v.as_label()))
                    .collect();
                let encoder = CategoryEncoder::fit(labels.iter().map(String::as_str));
                (column.to_string(), encoder)
            })
            .collect();

        Self { encoders }
    }

    /// Encode `value` for `column`.
    ///
    /// Returns the code and, when the value fell into the unknown bucket, a
    /// warning for the caller. Asking for a column without a fitted encoder
    /// is a schema mismatch.
    pub fn encode(
        &self,
        column: &str,
        value: Option<&str>,
    ) -> Result<(u32, Option<UnseenCategoryWarning>)> {
        let encoder = self.encoders.get(column).ok_or_else(|| {
            FraudError::SchemaMismatch(format!("no fitted encoder for column {column}"))
        })?;

        let encoded = encoder.encode(value);
        let warning = encoded.is_unknown().then(|| UnseenCategoryWarning {
            column: column.to_string(),
            value: value.map(str::to_string),
            code: encoded.code(),
        });

        Ok((encoded.code(), warning))
    }

    pub fn get(&self, column: &str) -> Option<&CategoryEncoder> {
        self.encoders.get(column)
    }

    /// Columns with a fitted encoder, sorted
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }
}
