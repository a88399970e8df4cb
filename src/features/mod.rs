//! Feature pipeline: derivation, categorical encoding and scaling.
//!
//! [`FeatureTransform`] bundles the schema with the fitted encoder and
//! scaler state. It is fitted once by the trainer and only ever used to
//! transform afterwards.

pub mod builder;
pub mod encoder;
pub mod row;
pub mod scaler;
pub mod schema;

pub use builder::{FeatureBuilder, FeatureVector, LabeledRows, RawRecord};
pub use encoder::{CategoryEncoder, EncoderState};
pub use row::{FeatureRow, FeatureValue};
pub use scaler::ScalerState;
pub use schema::FeatureSchema;

use crate::error::{FraudError, Result, UnseenCategoryWarning};
use serde::{Deserialize, Serialize};

/// A row turned into model input
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedRow {
    pub values: Vec<f64>,
    pub warnings: Vec<UnseenCategoryWarning>,
}

/// Fitted schema, encoders and scaler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransform {
    schema: FeatureSchema,
    encoders: EncoderState,
    scaler: ScalerState,
}

impl FeatureTransform {
    /// Fit encoders and scaler on training rows.
    ///
    /// Returns the fitted transform and the scaled training matrix.
    pub fn fit(schema: FeatureSchema, rows: &[FeatureRow]) -> Result<(Self, Vec<Vec<f64>>)> {
        if rows.is_empty() {
            return Err(FraudError::Training(
                "cannot fit the feature transform on zero rows".to_string(),
            ));
        }

        let encoders = EncoderState::fit(&schema, rows);
        let encoded = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                encode_row(&schema, &encoders, row)
                    .map(|(values, _)| values)
                    .map_err(|e| with_row_context(e, idx))
            })
            .collect::<Result<Vec<_>>>()?;

        let scaler = ScalerState::fit(&schema.matrix_columns(), &encoded)?;
        let matrix = encoded
            .iter()
            .map(|values| scaler.transform(values))
            .collect::<Result<Vec<_>>>()?;

        Ok((
            Self {
                schema,
                encoders,
                scaler,
            },
            matrix,
        ))
    }

    /// Rebuild a transform from persisted parts, checking they agree
    pub fn from_parts(schema: FeatureSchema, encoders: EncoderState, scaler: ScalerState) -> Result<Self> {
        let expected = schema.matrix_columns();
        if scaler.columns() != expected.as_slice() {
            return Err(FraudError::SchemaMismatch(format!(
                "scaler columns [{}] do not match schema [{}]",
                scaler.columns().join(", "),
                expected.join(", ")
            )));
        }
        for column in schema.categorical_columns() {
            if encoders.get(column).is_none() {
                return Err(FraudError::SchemaMismatch(format!(
                    "no fitted encoder for categorical column {column}"
                )));
            }
        }

        Ok(Self {
            schema,
            encoders,
            scaler,
        })
    }

    /// Transform one row with the fitted state
    pub fn transform(&self, row: &FeatureRow) -> Result<TransformedRow> {
        let (encoded, warnings) = encode_row(&self.schema, &self.encoders, row)?;
        let values = self.scaler.transform(&encoded)?;
        Ok(TransformedRow { values, warnings })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn encoders(&self) -> &EncoderState {
        &self.encoders
    }

    pub fn scaler(&self) -> &ScalerState {
        &self.scaler
    }
}

/// Lay a row out in schema order, encoding categorical columns.
///
/// Every schema column must be present in the row; missing or NaN numeric
/// values become 0.
fn encode_row(
    schema: &FeatureSchema,
    encoders: &EncoderState,
    row: &FeatureRow,
) -> Result<(Vec<f64>, Vec<UnseenCategoryWarning>)> {
    let missing: Vec<&str> = schema
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|c| !row.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        return Err(FraudError::SchemaMismatch(format!(
            "input is missing expected feature(s): {}",
            missing.join(", ")
        )));
    }

    let mut values = Vec::with_capacity(schema.len());
    let mut warnings = Vec::new();

    for column in schema.columns() {
        let value = &row[column];
        if FeatureSchema::is_categorical(column) {
            let label = value.as_label();
            let (code, warning) = encoders.encode(column, label.as_deref())?;
            if let Some(warning) = warning {
                warnings.push(warning);
            }
            values.push(f64::from(code));
        } else {
            let number = value.as_number().map_err(|text| FraudError::InvalidRecord {
                id: column.clone(),
                reason: format!("expected a number, got {text:?}"),
            })?;
            values.push(number.unwrap_or(0.0));
        }
    }

    Ok((values, warnings))
}

fn with_row_context(err: FraudError, idx: usize) -> FraudError {
    match err {
        FraudError::SchemaMismatch(msg) => FraudError::SchemaMismatch(format!("row {idx}: {msg}")),
        FraudError::InvalidRecord { id, reason } => FraudError::InvalidRecord {
            id: format!("row {idx} column {id}"),
            reason,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(amount: f64, category: &str) -> FeatureRow {
        let mut row = FeatureRow::new();
        row.insert("amount".to_string(), FeatureValue::Number(amount));
        row.insert("merchant_category".to_string(), FeatureValue::from(category));
        row
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::from_columns(&["amount".to_string(), "merchant_category".to_string()]).unwrap()
    }

    #[test]
    fn test_fit_then_transform_matches_training_matrix() {
        let rows = vec![row(10.0, "grocery"), row(30.0, "online"), row(20.0, "grocery")];
        let (transform, matrix) = FeatureTransform::fit(schema(), &rows).unwrap();

        assert_eq!(matrix.len(), 3);
        for (row, expected) in rows.iter().zip(&matrix) {
            let transformed = transform.transform(row).unwrap();
            assert_eq!(&transformed.values, expected);
            assert!(transformed.warnings.is_empty());
        }
    }

    #[test]
    fn test_unseen_category_degrades_to_unknown_bucket() {
        let rows = vec![row(10.0, "grocery"), row(30.0, "online")];
        let (transform, _) = FeatureTransform::fit(schema(), &rows).unwrap();

        let transformed = transform.transform(&row(15.0, "crypto")).unwrap();
        assert_eq!(transformed.values.len(), 2);
        assert_eq!(transformed.warnings.len(), 1);
        assert_eq!(transformed.warnings[0].code, 2);
    }

    #[test]
    fn test_missing_feature_is_schema_mismatch() {
        let rows = vec![row(10.0, "grocery"), row(30.0, "online")];
        let (transform, _) = FeatureTransform::fit(schema(), &rows).unwrap();

        let mut incomplete = FeatureRow::new();
        incomplete.insert("amount".to_string(), FeatureValue::Number(5.0));
        let err = transform.transform(&incomplete).unwrap_err();
        assert!(matches!(err, FraudError::SchemaMismatch(ref msg) if msg.contains("merchant_category")));
    }

    #[test]
    fn test_nan_and_null_default_to_zero() {
        let rows = vec![row(10.0, "grocery"), row(30.0, "online")];
        let (transform, _) = FeatureTransform::fit(schema(), &rows).unwrap();

        let nan = transform.transform(&row(f64::NAN, "grocery")).unwrap();
        let zero = transform.transform(&row(0.0, "grocery")).unwrap();
        assert_eq!(nan.values, zero.values);

        let mut null = row(0.0, "grocery");
        null.insert("amount".to_string(), FeatureValue::Missing);
        assert_eq!(transform.transform(&null).unwrap().values, zero.values);
    }

    #[test]
    fn test_text_in_numeric_column_is_rejected() {
        let rows = vec![row(10.0, "grocery"), row(30.0, "online")];
        let (transform, _) = FeatureTransform::fit(schema(), &rows).unwrap();

        let mut bad = row(0.0, "grocery");
        bad.insert("amount".to_string(), FeatureValue::from("lots"));
        assert!(matches!(
            transform.transform(&bad),
            Err(FraudError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_from_parts_checks_consistency() {
        let rows = vec![row(10.0, "grocery"), row(30.0, "online")];
        let (transform, _) = FeatureTransform::fit(schema(), &rows).unwrap();

        let rebuilt = FeatureTransform::from_parts(
            transform.schema().clone(),
            transform.encoders().clone(),
            transform.scaler().clone(),
        )
        .unwrap();
        assert_eq!(rebuilt, transform);

        let other_schema = FeatureSchema::standard();
        assert!(FeatureTransform::from_parts(
            other_schema,
            transform.encoders().clone(),
            transform.scaler().clone()
        )
        .is_err());
    }
}
