//! Synthetic transaction data generator
//!
//! Produces the three raw tables with a labelled fraud share. Fraud rows
//! skew towards night hours and extreme amounts; legitimate rows follow a
//! daytime profile and per-category amount distributions.

use crate::config::GenerationConfig;
use crate::error::{FraudError, Result};
use crate::ingestion::RawTables;
use crate::types::{Customer, Merchant, MerchantCategory, PaymentMethod, Transaction};
use chrono::{Duration, NaiveDateTime, Timelike};
use rand::distributions::WeightedIndex;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Beta, Distribution, Exp, LogNormal, Normal};
use tracing::info;

const FRAUD_HOURS: [u32; 6] = [2, 3, 4, 23, 0, 1];
const FRAUD_HOUR_WEIGHTS: [f64; 6] = [0.2, 0.2, 0.2, 0.15, 0.15, 0.1];

/// Relative transaction volume per hour for legitimate activity
const DAILY_PROFILE: [f64; 24] = [
    0.01, 0.01, 0.01, 0.01, 0.01, 0.02, // 0-5
    0.03, 0.05, 0.07, 0.06, 0.05, 0.06, // 6-11
    0.08, 0.07, 0.06, 0.05, 0.06, 0.07, // 12-17
    0.08, 0.07, 0.05, 0.04, 0.03, 0.02, // 18-23
];

const NAME_PREFIXES: [&str; 16] = [
    "Summit", "Harbor", "Blue Ridge", "Northwind", "Silver", "Maple", "Granite", "Evergreen",
    "Cedar", "Lakeside", "Redwood", "Pioneer", "Golden", "Riverside", "Oakmont", "Sterling",
];

const NAME_SUFFIXES: [&str; 10] = [
    "Holdings", "Supply", "Group", "Partners", "Traders", "Market", "Outfitters", "Co",
    "Services", "Goods",
];

const CITIES: [&str; 16] = [
    "New York", "Los Angeles", "Chicago", "Houston", "Phoenix", "Philadelphia", "San Antonio",
    "San Diego", "Dallas", "Austin", "Seattle", "Denver", "Boston", "Portland", "Atlanta",
    "Miami",
];

struct Samplers {
    age: Normal<f64>,
    account_age: Exp<f64>,
    credit_score: Normal<f64>,
    income: LogNormal<f64>,
    merchant_risk: Beta<f64>,
    fraud_hour: WeightedIndex<f64>,
    legit_hour: WeightedIndex<f64>,
    grocery: Normal<f64>,
    restaurant: Normal<f64>,
    gas_station: Normal<f64>,
    retail: Normal<f64>,
    other: LogNormal<f64>,
}

impl Samplers {
    fn new() -> Result<Self> {
        Ok(Self {
            age: Normal::new(40.0, 15.0).map_err(|e| invalid("age", e))?,
            account_age: Exp::new(1.0 / 365.0).map_err(|e| invalid("account age", e))?,
            credit_score: Normal::new(700.0, 100.0).map_err(|e| invalid("credit score", e))?,
            income: LogNormal::new(10.5, 0.5).map_err(|e| invalid("income", e))?,
            merchant_risk: Beta::new(2.0, 5.0).map_err(|e| invalid("merchant risk", e))?,
            fraud_hour: WeightedIndex::new(FRAUD_HOUR_WEIGHTS).map_err(|e| invalid("fraud hour", e))?,
            legit_hour: WeightedIndex::new(DAILY_PROFILE).map_err(|e| invalid("hour profile", e))?,
            grocery: Normal::new(75.0, 30.0).map_err(|e| invalid("grocery amount", e))?,
            restaurant: Normal::new(45.0, 20.0).map_err(|e| invalid("restaurant amount", e))?,
            gas_station: Normal::new(60.0, 15.0).map_err(|e| invalid("gas station amount", e))?,
            retail: Normal::new(120.0, 80.0).map_err(|e| invalid("retail amount", e))?,
            other: LogNormal::new(3.0, 1.5).map_err(|e| invalid("amount", e))?,
        })
    }
}

/// Seeded generator for the raw tables
pub struct TransactionGenerator {
    config: GenerationConfig,
    rng: ChaCha8Rng,
    samplers: Samplers,
}

impl TransactionGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        if config.start_date > config.end_date {
            return Err(FraudError::Config(format!(
                "start_date {} is after end_date {}",
                config.start_date, config.end_date
            )));
        }
        if !(0.0..=1.0).contains(&config.fraud_rate) {
            return Err(FraudError::Config(format!(
                "fraud_rate must be within [0, 1], got {}",
                config.fraud_rate
            )));
        }

        Ok(Self {
            config: config.clone(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            samplers: Samplers::new()?,
        })
    }

    /// Generate customers, merchants and transactions
    pub fn generate_all(&mut self) -> Result<RawTables> {
        info!(
            transactions = self.config.n_transactions,
            customers = self.config.n_customers,
            merchants = self.config.n_merchants,
            fraud_rate = self.config.fraud_rate,
            seed = self.config.seed,
            "Generating synthetic data"
        );

        let customers = self.generate_customers(self.config.n_customers);
        let merchants = self.generate_merchants(self.config.n_merchants);
        let transactions = self.generate_transactions(&customers, &merchants)?;

        let tables = RawTables {
            transactions,
            customers,
            merchants,
        };
        info!(
            transactions = tables.transactions.len(),
            fraud = tables.fraud_count(),
            "Synthetic data generated"
        );
        Ok(tables)
    }

    pub fn generate_customers(&mut self, n: usize) -> Vec<Customer> {
        (0..n)
            .map(|i| Customer {
                customer_id: format!("CUST_{i:06}"),
                age: self.samplers.age.sample(&mut self.rng).clamp(18.0, 100.0),
                account_age_days: self.samplers.account_age.sample(&mut self.rng),
                credit_score: self
                    .samplers
                    .credit_score
                    .sample(&mut self.rng)
                    .clamp(300.0, 850.0),
                income: self.samplers.income.sample(&mut self.rng),
            })
            .collect()
    }

    pub fn generate_merchants(&mut self, n: usize) -> Vec<Merchant> {
        (0..n)
            .map(|i| {
                let prefix = NAME_PREFIXES[self.rng.gen_range(0..NAME_PREFIXES.len())];
                let suffix = NAME_SUFFIXES[self.rng.gen_range(0..NAME_SUFFIXES.len())];
                let category = MerchantCategory::ALL[self.rng.gen_range(0..MerchantCategory::ALL.len())];
                Merchant {
                    merchant_id: format!("MERCH_{i:05}"),
                    merchant_name: format!("{prefix} {suffix}"),
                    category: category.as_str().to_string(),
                    risk_score: self.samplers.merchant_risk.sample(&mut self.rng),
                    location: CITIES[self.rng.gen_range(0..CITIES.len())].to_string(),
                }
            })
            .collect()
    }

    /// Generate transactions; the first `floor(n * fraud_rate)` are fraud
    pub fn generate_transactions(
        &mut self,
        customers: &[Customer],
        merchants: &[Merchant],
    ) -> Result<Vec<Transaction>> {
        if customers.is_empty() || merchants.is_empty() {
            return Err(FraudError::Config(
                "transactions need at least one customer and one merchant".to_string(),
            ));
        }

        let n = self.config.n_transactions;
        let n_fraud = (n as f64 * self.config.fraud_rate).floor() as usize;

        let start = self
            .config
            .start_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| FraudError::Config("invalid start_date".to_string()))?;
        let span = (self.config.end_date - self.config.start_date).num_seconds() + 86_399;

        let mut transactions = Vec::with_capacity(n);
        for i in 0..n {
            let is_fraud = i < n_fraud;
            let customer = customers.choose(&mut self.rng).ok_or_else(no_rows)?;
            let merchant = merchants.choose(&mut self.rng).ok_or_else(no_rows)?;

            let timestamp = start + Duration::seconds(self.rng.gen_range(0..=span));
            let (amount, hour) = if is_fraud {
                let amount = self.fraud_amount(&merchant.category);
                (amount, FRAUD_HOURS[self.samplers.fraud_hour.sample(&mut self.rng)])
            } else {
                let amount = self.normal_amount(&merchant.category);
                (amount, self.samplers.legit_hour.sample(&mut self.rng) as u32)
            };

            transactions.push(Transaction {
                transaction_id: format!("TXN_{i:08}"),
                customer_id: customer.customer_id.clone(),
                merchant_id: merchant.merchant_id.clone(),
                amount: round_cents(amount),
                timestamp: with_hour(timestamp, hour),
                payment_method: PaymentMethod::ALL[self.rng.gen_range(0..PaymentMethod::ALL.len())],
                merchant_category: merchant.category.clone(),
                is_fraud,
            });
        }

        Ok(transactions)
    }

    fn normal_amount(&mut self, category: &str) -> f64 {
        let rng = &mut self.rng;
        match MerchantCategory::parse(category) {
            Some(MerchantCategory::Grocery) => self.samplers.grocery.sample(rng).max(10.0),
            Some(MerchantCategory::Restaurant) => self.samplers.restaurant.sample(rng).max(5.0),
            Some(MerchantCategory::GasStation) => self.samplers.gas_station.sample(rng).max(20.0),
            Some(MerchantCategory::Retail) => self.samplers.retail.sample(rng).max(15.0),
            _ => self.samplers.other.sample(rng).max(5.0),
        }
    }

    fn fraud_amount(&mut self, category: &str) -> f64 {
        if self.rng.gen::<f64>() < 0.3 {
            self.rng.gen_range(1000.0..5000.0)
        } else if self.rng.gen::<f64>() < 0.5 {
            self.rng.gen_range(0.01..5.0)
        } else {
            self.normal_amount(category) * self.rng.gen_range(2.0..10.0)
        }
    }
}

fn invalid(what: &str, err: impl std::fmt::Display) -> FraudError {
    FraudError::Config(format!("invalid {what} distribution: {err}"))
}

fn no_rows() -> FraudError {
    FraudError::Config("cannot sample from an empty table".to_string())
}

fn with_hour(timestamp: NaiveDateTime, hour: u32) -> NaiveDateTime {
    timestamp.with_hour(hour).unwrap_or(timestamp)
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn config(n: usize) -> GenerationConfig {
        GenerationConfig {
            n_transactions: n,
            n_customers: 50,
            n_merchants: 20,
            fraud_rate: 0.05,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            seed: 42,
        }
    }

    #[test]
    fn test_fraud_share_and_order() {
        let tables = TransactionGenerator::new(&config(1000))
            .unwrap()
            .generate_all()
            .unwrap();

        assert_eq!(tables.transactions.len(), 1000);
        assert_eq!(tables.customers.len(), 50);
        assert_eq!(tables.merchants.len(), 20);
        assert_eq!(tables.fraud_count(), 50);
        assert!(tables.transactions[..50].iter().all(|t| t.is_fraud));
        assert!(tables.transactions[50..].iter().all(|t| !t.is_fraud));
    }

    #[test]
    fn test_value_ranges() {
        let cfg = config(500);
        let tables = TransactionGenerator::new(&cfg).unwrap().generate_all().unwrap();

        for c in &tables.customers {
            assert!((18.0..=100.0).contains(&c.age));
            assert!((300.0..=850.0).contains(&c.credit_score));
            assert!(c.account_age_days >= 0.0);
            assert!(c.income > 0.0);
        }
        for m in &tables.merchants {
            assert!((0.0..=1.0).contains(&m.risk_score));
            assert!(MerchantCategory::parse(&m.category).is_some());
        }
        for t in &tables.transactions {
            assert!(t.amount >= 0.0);
            assert_eq!(t.amount, round_cents(t.amount));
            let date = t.timestamp.date();
            assert!(date >= cfg.start_date && date <= cfg.end_date);
            if t.is_fraud {
                assert!(FRAUD_HOURS.contains(&t.hour_of_day()));
            }
        }
    }

    #[test]
    fn test_same_seed_same_data() {
        let a = TransactionGenerator::new(&config(200)).unwrap().generate_all().unwrap();
        let b = TransactionGenerator::new(&config(200)).unwrap().generate_all().unwrap();
        assert_eq!(a, b);

        let mut other = config(200);
        other.seed = 7;
        let c = TransactionGenerator::new(&other).unwrap().generate_all().unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_rejects_inverted_dates() {
        let mut cfg = config(10);
        cfg.end_date = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        assert!(matches!(
            TransactionGenerator::new(&cfg),
            Err(FraudError::Config(_))
        ));
    }
}
