//! Customer and merchant reference tables

use serde::{Deserialize, Serialize};

/// Account holder, static for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    /// Age in years
    pub age: f64,
    pub account_age_days: f64,
    pub credit_score: f64,
    /// Yearly income
    pub income: f64,
}

/// Merchant the transaction was made at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
    pub merchant_id: String,
    pub merchant_name: String,
    pub category: String,
    /// Prior risk estimate in [0, 1]
    pub risk_score: f64,
    pub location: String,
}
