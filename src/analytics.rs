//! Dataset overview: totals, per-category, per-hour and daily fraud breakdowns

use crate::ingestion::RawTables;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Fraud figures for one merchant category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub transactions: usize,
    pub fraud: usize,
    pub fraud_rate: f64,
    pub volume: f64,
}

/// Fraud figures for one hour of the day
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HourStats {
    pub hour: u32,
    pub transactions: usize,
    pub fraud: usize,
    pub fraud_rate: f64,
}

/// Transaction volume and fraud for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub transactions: usize,
    pub fraud: usize,
    pub fraud_rate: f64,
    pub volume: f64,
}

#[derive(Default)]
struct Tally {
    transactions: usize,
    fraud: usize,
    volume: f64,
}

impl Tally {
    fn add(&mut self, amount: f64, is_fraud: bool) {
        self.transactions += 1;
        self.volume += amount;
        if is_fraud {
            self.fraud += 1;
        }
    }

    fn fraud_rate(&self) -> f64 {
        if self.transactions == 0 {
            0.0
        } else {
            self.fraud as f64 / self.transactions as f64
        }
    }
}

/// Summary of a transaction table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_transactions: usize,
    pub fraud_transactions: usize,
    pub fraud_rate: f64,
    pub total_amount: f64,
    /// Sorted by descending fraud rate
    pub by_category: Vec<CategoryStats>,
    /// One entry per hour of day, index = hour
    pub by_hour: Vec<HourStats>,
    /// Days in chronological order
    pub daily: Vec<DailyStats>,
}

impl Overview {
    pub fn compute(tables: &RawTables) -> Self {
        let mut categories: BTreeMap<&str, Tally> = BTreeMap::new();
        let mut days: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
        let mut hours: Vec<Tally> = (0..24).map(|_| Tally::default()).collect();
        let mut total = Tally::default();

        for t in &tables.transactions {
            total.add(t.amount, t.is_fraud);
            categories
                .entry(t.merchant_category.as_str())
                .or_default()
                .add(t.amount, t.is_fraud);
            days.entry(t.timestamp.date())
                .or_default()
                .add(t.amount, t.is_fraud);
            hours[t.hour_of_day() as usize % 24].add(t.amount, t.is_fraud);
        }

        let mut by_category: Vec<CategoryStats> = categories
            .into_iter()
            .map(|(category, tally)| CategoryStats {
                category: category.to_string(),
                transactions: tally.transactions,
                fraud: tally.fraud,
                fraud_rate: tally.fraud_rate(),
                volume: tally.volume,
            })
            .collect();
        by_category.sort_by(|a, b| {
            b.fraud_rate
                .total_cmp(&a.fraud_rate)
                .then_with(|| a.category.cmp(&b.category))
        });

        let by_hour = hours
            .iter()
            .zip(0u32..)
            .map(|(tally, hour)| HourStats {
                hour,
                transactions: tally.transactions,
                fraud: tally.fraud,
                fraud_rate: tally.fraud_rate(),
            })
            .collect();

        let daily = days
            .into_iter()
            .map(|(date, tally)| DailyStats {
                date,
                transactions: tally.transactions,
                fraud: tally.fraud,
                fraud_rate: tally.fraud_rate(),
                volume: tally.volume,
            })
            .collect();

        Self {
            total_transactions: total.transactions,
            fraud_transactions: total.fraud,
            fraud_rate: total.fraud_rate(),
            total_amount: total.volume,
            by_category,
            by_hour,
            daily,
        }
    }

    /// Print the overview as a boxed summary
    pub fn print_summary(&self) {
        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              FRAUD DETECTION - DATASET OVERVIEW              ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Transactions: {:>10}  │  Fraud: {:>7} ({:>5.2}%)          ║",
            self.total_transactions,
            self.fraud_transactions,
            self.fraud_rate * 100.0
        );
        info!("║ Total Amount: {:>16.2}                               ║", self.total_amount);
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Fraud Rate by Category:                                      ║");
        for c in &self.by_category {
            info!(
                "║   {:<14} {:>6} tx {:>5} fraud ({:>5.2}%) {:>12.2}",
                c.category,
                c.transactions,
                c.fraud,
                c.fraud_rate * 100.0,
                c.volume
            );
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Fraud by Hour:                                               ║");
        let peak = self.by_hour.iter().map(|h| h.fraud).max().unwrap_or(0).max(1);
        for h in self.by_hour.iter().filter(|h| h.fraud > 0) {
            let bar: String = "█".repeat(h.fraud * 20 / peak);
            info!(
                "║   {:02}:00 {:>6} / {:<6} ({:>5.2}%) {}",
                h.hour,
                h.fraud,
                h.transactions,
                h.fraud_rate * 100.0,
                bar
            );
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Daily Trend: {:>4} days                                       ║", self.daily.len());
        for d in &self.daily {
            debug!(
                "║   {} {:>6} tx {:>5} fraud ({:>5.2}%) {:>12.2}",
                d.date,
                d.transactions,
                d.fraud,
                d.fraud_rate * 100.0,
                d.volume
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, Transaction};
    use chrono::NaiveDate;

    fn tx(category: &str, amount: f64, hour: u32, is_fraud: bool) -> Transaction {
        on_day(1, category, amount, hour, is_fraud)
    }

    fn on_day(day: u32, category: &str, amount: f64, hour: u32, is_fraud: bool) -> Transaction {
        Transaction {
            transaction_id: format!("TXN_{category}_{day}_{hour}"),
            customer_id: "CUST_000001".to_string(),
            merchant_id: "MERCH_00001".to_string(),
            amount,
            timestamp: NaiveDate::from_ymd_opt(2024, 6, day)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            payment_method: PaymentMethod::CreditCard,
            merchant_category: category.to_string(),
            is_fraud,
        }
    }

    #[test]
    fn test_overview() {
        let tables = RawTables {
            transactions: vec![
                tx("online", 1000.0, 2, true),
                tx("online", 50.0, 14, false),
                tx("grocery", 30.0, 10, false),
                tx("grocery", 20.0, 3, true),
                tx("grocery", 25.0, 12, false),
                on_day(2, "grocery", 40.0, 3, false),
            ],
            ..RawTables::default()
        };

        let overview = Overview::compute(&tables);
        assert_eq!(overview.total_transactions, 6);
        assert_eq!(overview.fraud_transactions, 2);
        assert!((overview.fraud_rate - 2.0 / 6.0).abs() < 1e-12);
        assert!((overview.total_amount - 1165.0).abs() < 1e-9);

        assert_eq!(overview.by_category[0].category, "online");
        assert!((overview.by_category[0].fraud_rate - 0.5).abs() < 1e-12);
        assert_eq!(overview.by_category[1].transactions, 4);
        assert!((overview.by_category[1].volume - 115.0).abs() < 1e-9);

        assert_eq!(overview.by_hour.len(), 24);
        assert_eq!(overview.by_hour[2].fraud, 1);
        assert_eq!(overview.by_hour[3].transactions, 2);
        assert_eq!(overview.by_hour[3].fraud, 1);
        assert!((overview.by_hour[3].fraud_rate - 0.5).abs() < 1e-12);
        assert_eq!(overview.by_hour[5].transactions, 0);
        assert_eq!(overview.by_hour[5].fraud_rate, 0.0);
        assert_eq!(overview.by_hour.iter().map(|h| h.fraud).sum::<usize>(), 2);

        assert_eq!(overview.daily.len(), 2);
        let first = &overview.daily[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(first.transactions, 5);
        assert_eq!(first.fraud, 2);
        assert!((first.fraud_rate - 0.4).abs() < 1e-12);
        assert!((first.volume - 1125.0).abs() < 1e-9);
        assert_eq!(overview.daily[1].fraud, 0);
        assert!((overview.daily[1].volume - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_tables() {
        let overview = Overview::compute(&RawTables::default());
        assert_eq!(overview.total_transactions, 0);
        assert_eq!(overview.fraud_rate, 0.0);
        assert!(overview.by_category.is_empty());
        assert!(overview.daily.is_empty());
        assert!(overview.by_hour.iter().all(|h| h.transactions == 0));
    }
}
