//! Feature derivation from the joined raw tables.
//!
//! Produces the same columns whether called while building a training set or
//! while preparing a single transaction for scoring.

use crate::error::{FraudError, Result};
use crate::features::row::{FeatureRow, FeatureValue};
use crate::types::{Customer, Merchant, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Added to the customer's standard deviation before dividing
pub const ZSCORE_EPSILON: f64 = 1e-6;

/// |z| above which an amount counts as an outlier
pub const OUTLIER_ZSCORE: f64 = 2.0;

/// Merchant risk score above which a merchant counts as high risk
pub const HIGH_RISK_MERCHANT_SCORE: f64 = 0.7;

/// Per-customer amount statistics over all of the customer's transactions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CustomerStats {
    pub transaction_frequency: usize,
    pub avg_amount: f64,
    /// Sample standard deviation, 0 for a single transaction
    pub std_amount: f64,
}

/// Aggregate amount statistics per customer id
pub fn customer_stats(transactions: &[Transaction]) -> HashMap<String, CustomerStats> {
    let mut amounts: HashMap<&str, Vec<f64>> = HashMap::new();
    for tx in transactions {
        amounts.entry(tx.customer_id.as_str()).or_default().push(tx.amount);
    }

    amounts
        .into_iter()
        .map(|(customer_id, amounts)| {
            let n = amounts.len();
            let avg_amount = amounts.iter().sum::<f64>() / n as f64;
            let std_amount = if n > 1 {
                let variance = amounts
                    .iter()
                    .map(|a| (a - avg_amount).powi(2))
                    .sum::<f64>()
                    / (n - 1) as f64;
                variance.sqrt()
            } else {
                0.0
            };

            (
                customer_id.to_string(),
                CustomerStats {
                    transaction_frequency: n,
                    avg_amount,
                    std_amount,
                },
            )
        })
        .collect()
}

/// z-score of `amount` against the customer's history
pub fn amount_zscore(amount: f64, avg_amount: f64, std_amount: f64) -> f64 {
    (amount - avg_amount) / (std_amount + ZSCORE_EPSILON)
}

/// 22:00 - 06:59
pub fn is_night_hour(hour: u32) -> bool {
    hour >= 22 || hour <= 6
}

/// Saturday (5) or Sunday (6), with Monday = 0
pub fn is_weekend_day(day_of_week: u32) -> bool {
    matches!(day_of_week, 5 | 6)
}

/// One transaction joined with its customer, merchant and customer stats.
/// Absent joins model left-join gaps.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    pub transaction: &'a Transaction,
    pub customer: Option<&'a Customer>,
    pub merchant: Option<&'a Merchant>,
    pub stats: Option<CustomerStats>,
}

/// Derived features for one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub amount: f64,
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub customer_age: f64,
    pub transaction_frequency: usize,
    pub amount_zscore: f64,
    pub is_night_transaction: bool,
    pub is_weekend_transaction: bool,
    pub is_amount_outlier: bool,
    pub merchant_risk_score: f64,
    pub is_high_risk_merchant: bool,
    pub merchant_category: Option<String>,
}

impl FeatureVector {
    /// Derive the feature vector of a joined record.
    ///
    /// Missing joins default numeric values to 0 and the category to missing;
    /// a negative or non-finite amount is rejected.
    pub fn derive(record: &RawRecord<'_>) -> Result<Self> {
        let tx = record.transaction;
        if !tx.amount.is_finite() || tx.amount < 0.0 {
            return Err(FraudError::InvalidRecord {
                id: tx.transaction_id.clone(),
                reason: format!("amount must be a non-negative number, got {}", tx.amount),
            });
        }

        let hour_of_day = tx.hour_of_day();
        let day_of_week = tx.day_of_week();

        let (transaction_frequency, amount_zscore) = match record.stats {
            Some(stats) => (
                stats.transaction_frequency,
                finite_or_zero(amount_zscore(tx.amount, stats.avg_amount, stats.std_amount)),
            ),
            None => (0, 0.0),
        };

        let customer_age = record.customer.map(|c| finite_or_zero(c.age)).unwrap_or(0.0);
        let merchant_risk_score = record
            .merchant
            .map(|m| finite_or_zero(m.risk_score))
            .unwrap_or(0.0);

        let merchant_category = Some(tx.merchant_category.trim())
            .filter(|c| !c.is_empty())
            .or_else(|| record.merchant.map(|m| m.category.trim()).filter(|c| !c.is_empty()))
            .map(str::to_string);

        Ok(Self {
            amount: tx.amount,
            hour_of_day,
            day_of_week,
            customer_age,
            transaction_frequency,
            amount_zscore,
            is_night_transaction: is_night_hour(hour_of_day),
            is_weekend_transaction: is_weekend_day(day_of_week),
            is_amount_outlier: amount_zscore.abs() > OUTLIER_ZSCORE,
            merchant_risk_score,
            is_high_risk_merchant: merchant_risk_score > HIGH_RISK_MERCHANT_SCORE,
            merchant_category,
        })
    }

    /// Feature row keyed by the schema's column names
    pub fn to_row(&self) -> FeatureRow {
        let mut row = FeatureRow::new();
        row.insert("amount".to_string(), self.amount.into());
        row.insert("hour_of_day".to_string(), f64::from(self.hour_of_day).into());
        row.insert("day_of_week".to_string(), f64::from(self.day_of_week).into());
        row.insert("customer_age".to_string(), self.customer_age.into());
        row.insert(
            "transaction_frequency".to_string(),
            (self.transaction_frequency as f64).into(),
        );
        row.insert("amount_zscore".to_string(), self.amount_zscore.into());
        row.insert("is_night_transaction".to_string(), self.is_night_transaction.into());
        row.insert("is_weekend_transaction".to_string(), self.is_weekend_transaction.into());
        row.insert("is_amount_outlier".to_string(), self.is_amount_outlier.into());
        row.insert("merchant_risk_score".to_string(), self.merchant_risk_score.into());
        row.insert("is_high_risk_merchant".to_string(), self.is_high_risk_merchant.into());
        row.insert(
            "merchant_category".to_string(),
            self.merchant_category
                .clone()
                .map(FeatureValue::Text)
                .unwrap_or(FeatureValue::Missing),
        );
        row
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Feature rows with their labels, aligned by index
#[derive(Debug, Clone, Default)]
pub struct LabeledRows {
    pub transaction_ids: Vec<String>,
    pub rows: Vec<FeatureRow>,
    pub labels: Vec<bool>,
}

impl LabeledRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fraud_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }
}

/// Joins the raw tables and derives features for every transaction
pub struct FeatureBuilder<'a> {
    customers: HashMap<&'a str, &'a Customer>,
    merchants: HashMap<&'a str, &'a Merchant>,
    stats: HashMap<String, CustomerStats>,
}

impl<'a> FeatureBuilder<'a> {
    /// Index the reference tables and compute customer statistics over
    /// `transactions`.
    pub fn new(
        transactions: &[Transaction],
        customers: &'a [Customer],
        merchants: &'a [Merchant],
    ) -> Self {
        Self {
            customers: customers.iter().map(|c| (c.customer_id.as_str(), c)).collect(),
            merchants: merchants.iter().map(|m| (m.merchant_id.as_str(), m)).collect(),
            stats: customer_stats(transactions),
        }
    }

    /// Left-join one transaction against the reference tables
    pub fn record<'t>(&'t self, transaction: &'t Transaction) -> RawRecord<'t>
    where
        'a: 't,
    {
        RawRecord {
            transaction,
            customer: self.customers.get(transaction.customer_id.as_str()).copied(),
            merchant: self.merchants.get(transaction.merchant_id.as_str()).copied(),
            stats: self.stats.get(&transaction.customer_id).copied(),
        }
    }

    /// Derive features for one transaction
    pub fn derive(&self, transaction: &Transaction) -> Result<FeatureVector> {
        FeatureVector::derive(&self.record(transaction))
    }

    /// Derive feature rows and labels for a whole table
    pub fn build(&self, transactions: &[Transaction]) -> Result<LabeledRows> {
        let mut out = LabeledRows {
            transaction_ids: Vec::with_capacity(transactions.len()),
            rows: Vec::with_capacity(transactions.len()),
            labels: Vec::with_capacity(transactions.len()),
        };

        for tx in transactions {
            let features = self.derive(tx)?;
            out.transaction_ids.push(tx.transaction_id.clone());
            out.rows.push(features.to_row());
            out.labels.push(tx.is_fraud);
        }

        Ok(out)
    }

    pub fn customer_stats(&self, customer_id: &str) -> Option<CustomerStats> {
        self.stats.get(customer_id).copied()
    }
}
