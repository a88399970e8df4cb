//! Data quality checks over the raw tables

use crate::ingestion::RawTables;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

/// Amounts above this are considered excessive
pub const EXCESSIVE_AMOUNT: f64 = 100_000.0;
/// Share of excessive amounts tolerated
pub const MAX_EXCESSIVE_SHARE: f64 = 0.01;
/// Accepted fraud rate band
pub const FRAUD_RATE_RANGE: (f64, f64) = (0.005, 0.10);
/// Accepted customer age band
pub const CUSTOMER_AGE_RANGE: (f64, f64) = (18.0, 100.0);

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn new(name: &'static str, passed: bool, detail: String) -> Self {
        Self { name, passed, detail }
    }
}

/// All check outcomes for one dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub checks: Vec<CheckResult>,
}

impl QualityReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }

    /// Log passes at info and failures at warn
    pub fn log(&self) {
        for check in &self.checks {
            if check.passed {
                info!(check = check.name, detail = %check.detail, "Quality check passed");
            } else {
                warn!(check = check.name, detail = %check.detail, "Quality check failed");
            }
        }
        let failed = self.failures().count();
        info!(checks = self.checks.len(), failed, "Data quality checks complete");
    }
}

/// Run every check. `now` bounds the timestamp check.
pub fn run_checks(tables: &RawTables, now: NaiveDateTime) -> QualityReport {
    QualityReport {
        checks: vec![
            check_completeness(tables),
            check_amounts(tables),
            check_fraud_rate(tables),
            check_customer_ages(tables),
            check_merchant_risk(tables),
            check_timestamps(tables, now),
        ],
    }
}

fn check_completeness(tables: &RawTables) -> CheckResult {
    let name = "transaction_completeness";
    if tables.transactions.is_empty() {
        return CheckResult::new(name, false, "no transaction data found".to_string());
    }

    let incomplete = tables
        .transactions
        .iter()
        .filter(|t| {
            t.transaction_id.trim().is_empty()
                || t.customer_id.trim().is_empty()
                || t.merchant_id.trim().is_empty()
                || t.amount.is_nan()
        })
        .count();
    CheckResult::new(
        name,
        incomplete == 0,
        format!(
            "{incomplete} of {} transactions missing an id or amount",
            tables.transactions.len()
        ),
    )
}

fn check_amounts(tables: &RawTables) -> CheckResult {
    let total = tables.transactions.len();
    let negative = tables.transactions.iter().filter(|t| t.amount < 0.0).count();
    let excessive = tables
        .transactions
        .iter()
        .filter(|t| t.amount > EXCESSIVE_AMOUNT)
        .count();
    let passed = negative == 0 && (excessive as f64) < MAX_EXCESSIVE_SHARE * total.max(1) as f64;
    CheckResult::new(
        "amount_validity",
        passed,
        format!("{negative} negative, {excessive} above {EXCESSIVE_AMOUNT} of {total}"),
    )
}

fn check_fraud_rate(tables: &RawTables) -> CheckResult {
    let total = tables.transactions.len();
    let rate = if total == 0 {
        0.0
    } else {
        tables.fraud_count() as f64 / total as f64
    };
    let (low, high) = FRAUD_RATE_RANGE;
    CheckResult::new(
        "fraud_rate",
        (low..=high).contains(&rate),
        format!(
            "fraud rate {:.2}% (expected {:.1}% - {:.1}%)",
            rate * 100.0,
            low * 100.0,
            high * 100.0
        ),
    )
}

fn check_customer_ages(tables: &RawTables) -> CheckResult {
    let (low, high) = CUSTOMER_AGE_RANGE;
    let out_of_range = tables
        .customers
        .iter()
        .filter(|c| !(low..=high).contains(&c.age))
        .count();
    CheckResult::new(
        "customer_age",
        out_of_range == 0,
        format!(
            "{out_of_range} of {} customers outside {low}-{high} years",
            tables.customers.len()
        ),
    )
}

fn check_merchant_risk(tables: &RawTables) -> CheckResult {
    let invalid = tables
        .merchants
        .iter()
        .filter(|m| !(0.0..=1.0).contains(&m.risk_score))
        .count();
    CheckResult::new(
        "merchant_risk_score",
        invalid == 0,
        format!(
            "{invalid} of {} merchants with a risk score outside [0, 1]",
            tables.merchants.len()
        ),
    )
}

fn check_timestamps(tables: &RawTables, now: NaiveDateTime) -> CheckResult {
    let future = tables.transactions.iter().filter(|t| t.timestamp > now).count();
    let span = tables
        .transactions
        .iter()
        .map(|t| t.timestamp)
        .min()
        .zip(tables.transactions.iter().map(|t| t.timestamp).max());
    let detail = match span {
        Some((first, last)) => format!("{future} in the future; range {first} .. {last}"),
        None => "no timestamps".to_string(),
    };
    CheckResult::new("timestamp_validity", future == 0, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::generator::TransactionGenerator;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn generated() -> RawTables {
        let config = GenerationConfig {
            n_transactions: 400,
            n_customers: 40,
            n_merchants: 20,
            ..GenerationConfig::default()
        };
        TransactionGenerator::new(&config).unwrap().generate_all().unwrap()
    }

    #[test]
    fn test_generated_data_passes() {
        let report = run_checks(&generated(), now());
        assert_eq!(report.checks.len(), 6);
        assert!(report.passed(), "{:?}", report.failures().collect::<Vec<_>>());
    }

    #[test]
    fn test_failures_are_reported() {
        let mut tables = generated();
        tables.transactions[0].amount = -1.0;
        tables.customers[0].age = 12.0;
        tables.merchants[0].risk_score = 1.5;
        tables.transactions[1].transaction_id = String::new();

        let report = run_checks(&tables, now());
        let failed: Vec<&str> = report.failures().map(|c| c.name).collect();
        assert_eq!(
            failed,
            vec![
                "transaction_completeness",
                "amount_validity",
                "customer_age",
                "merchant_risk_score"
            ]
        );
    }

    #[test]
    fn test_fraud_rate_band() {
        let mut tables = generated();
        for t in &mut tables.transactions {
            t.is_fraud = false;
        }
        let report = run_checks(&tables, now());
        assert!(report.failures().any(|c| c.name == "fraud_rate"));
    }

    #[test]
    fn test_future_timestamps_fail() {
        let tables = generated();
        let before_data = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let report = run_checks(&tables, before_data);
        assert!(report.failures().any(|c| c.name == "timestamp_validity"));
    }
}
