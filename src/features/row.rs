//! Loosely typed feature rows, the predictor's input format

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from feature name to value
pub type FeatureRow = BTreeMap<String, FeatureValue>;

/// A single cell of a feature row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Flag(bool),
    Number(f64),
    Text(String),
    Missing,
}

impl FeatureValue {
    /// Interpret a raw CSV cell: empty is missing, `true`/`false` are flags,
    /// anything numeric is a number, the rest is text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return FeatureValue::Missing;
        }
        match trimmed {
            "true" | "True" | "TRUE" => return FeatureValue::Flag(true),
            "false" | "False" | "FALSE" => return FeatureValue::Flag(false),
            _ => {}
        }
        match trimmed.parse::<f64>() {
            Ok(number) => FeatureValue::Number(number),
            Err(_) => FeatureValue::Text(trimmed.to_string()),
        }
    }

    /// Numeric view of the value.
    ///
    /// `Ok(None)` for missing or NaN values, `Err` with the offending text
    /// when a text cell is not a number.
    pub fn as_number(&self) -> Result<Option<f64>, String> {
        match self {
            FeatureValue::Number(n) if n.is_nan() => Ok(None),
            FeatureValue::Number(n) => Ok(Some(*n)),
            FeatureValue::Flag(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
            FeatureValue::Missing => Ok(None),
            FeatureValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_nan() => Ok(None),
                Ok(n) => Ok(Some(n)),
                Err(_) => Err(s.clone()),
            },
        }
    }

    /// Category label of the value, `None` when missing
    pub fn as_label(&self) -> Option<String> {
        match self {
            FeatureValue::Text(s) if s.trim().is_empty() => None,
            FeatureValue::Text(s) => Some(s.clone()),
            FeatureValue::Number(n) if n.is_nan() => None,
            FeatureValue::Number(n) => Some(n.to_string()),
            FeatureValue::Flag(b) => Some(b.to_string()),
            FeatureValue::Missing => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Flag(b) => write!(f, "{b}"),
            FeatureValue::Number(n) => write!(f, "{n}"),
            FeatureValue::Text(s) => f.write_str(s),
            FeatureValue::Missing => Ok(()),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Flag(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}
