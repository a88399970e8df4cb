//! Prediction output structures

use crate::error::UnseenCategoryWarning;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probability above which a transaction is labelled fraudulent
pub const FRAUD_THRESHOLD: f64 = 0.5;

/// Lower bound (inclusive) of the Medium tier
pub const MEDIUM_RISK_FLOOR: f64 = 0.3;

/// Lower bound (inclusive) of the High tier
pub const HIGH_RISK_FLOOR: f64 = 0.7;

/// Risk tier classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Determine the tier from a fraud probability.
    ///
    /// Bands are fixed policy: `[0, 0.3)` Low, `[0.3, 0.7)` Medium, `[0.7, 1]` High.
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_RISK_FLOOR {
            RiskTier::High
        } else if probability >= MEDIUM_RISK_FLOOR {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scored result for one feature row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Fraud probability (0.0 - 1.0)
    pub fraud_probability: f64,

    /// `fraud_probability > FRAUD_THRESHOLD`
    pub is_fraud_predicted: bool,

    /// Risk tier for the probability
    pub risk_level: RiskTier,

    /// Categorical values that fell into the unknown bucket
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<UnseenCategoryWarning>,
}

impl Prediction {
    /// Build a prediction from a raw model probability, clamped into [0, 1]
    pub fn from_probability(probability: f64) -> Self {
        let fraud_probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            fraud_probability,
            is_fraud_predicted: fraud_probability > FRAUD_THRESHOLD,
            risk_level: RiskTier::from_probability(fraud_probability),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<UnseenCategoryWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_tier_boundaries() {
        assert_eq!(RiskTier::from_probability(0.0), RiskTier::Low);
        assert_eq!(RiskTier::from_probability(0.2999), RiskTier::Low);
        assert_eq!(RiskTier::from_probability(0.3), RiskTier::Medium);
        assert_eq!(RiskTier::from_probability(0.6999), RiskTier::Medium);
        assert_eq!(RiskTier::from_probability(0.7), RiskTier::High);
        assert_eq!(RiskTier::from_probability(1.0), RiskTier::High);
    }

    #[test]
    fn test_label_follows_threshold() {
        assert!(!Prediction::from_probability(0.5).is_fraud_predicted);
        assert!(Prediction::from_probability(0.5001).is_fraud_predicted);
        assert!(!Prediction::from_probability(0.1).is_fraud_predicted);
    }

    #[test]
    fn test_probability_is_clamped() {
        assert_eq!(Prediction::from_probability(1.2).fraud_probability, 1.0);
        assert_eq!(Prediction::from_probability(-0.1).fraud_probability, 0.0);
        assert_eq!(Prediction::from_probability(f64::NAN).fraud_probability, 0.0);
    }

    #[test]
    fn test_prediction_serialization() {
        let prediction = Prediction::from_probability(0.82);
        let json = serde_json::to_string(&prediction).unwrap();
        assert!(json.contains("\"risk_level\":\"High\""));
        assert!(!json.contains("warnings"));

        let deserialized: Prediction = serde_json::from_str(&json).unwrap();
        assert_eq!(prediction, deserialized);
    }
}
