//! Raw table storage: transactions, customers and merchants as CSV

use crate::error::{FraudError, Result};
use crate::features::{FeatureBuilder, LabeledRows};
use crate::types::{Customer, Merchant, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const CUSTOMERS_FILE: &str = "customers.csv";
pub const MERCHANTS_FILE: &str = "merchants.csv";

/// The three raw tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTables {
    pub transactions: Vec<Transaction>,
    pub customers: Vec<Customer>,
    pub merchants: Vec<Merchant>,
}

impl RawTables {
    /// Read all three tables from `dir`
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let tables = Self {
            transactions: read_table(&dir.join(TRANSACTIONS_FILE))?,
            customers: read_table(&dir.join(CUSTOMERS_FILE))?,
            merchants: read_table(&dir.join(MERCHANTS_FILE))?,
        };

        info!(
            dir = %dir.display(),
            transactions = tables.transactions.len(),
            customers = tables.customers.len(),
            merchants = tables.merchants.len(),
            "Raw tables loaded"
        );
        Ok(tables)
    }

    /// Write all three tables into `dir`, creating it if needed
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        write_table(&dir.join(CUSTOMERS_FILE), &self.customers)?;
        write_table(&dir.join(MERCHANTS_FILE), &self.merchants)?;
        write_table(&dir.join(TRANSACTIONS_FILE), &self.transactions)?;

        info!(
            dir = %dir.display(),
            transactions = self.transactions.len(),
            fraud = self.fraud_count(),
            "Raw tables saved"
        );
        Ok(())
    }

    pub fn fraud_count(&self) -> usize {
        self.transactions.iter().filter(|t| t.is_fraud).count()
    }

    /// Left-join the tables and derive labelled feature rows.
    ///
    /// Customer statistics are computed over every transaction in the table.
    pub fn feature_rows(&self) -> Result<LabeledRows> {
        FeatureBuilder::new(&self.transactions, &self.customers, &self.merchants).build(&self.transactions)
    }
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.is_file() {
        return Err(FraudError::DataNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;
    use chrono::NaiveDate;
    use std::io::Write;

    fn tables() -> RawTables {
        RawTables {
            transactions: vec![Transaction {
                transaction_id: "TXN_00000000".to_string(),
                customer_id: "CUST_000000".to_string(),
                merchant_id: "MERCH_00000".to_string(),
                amount: 12.34,
                timestamp: NaiveDate::from_ymd_opt(2024, 5, 4)
                    .unwrap()
                    .and_hms_opt(3, 15, 0)
                    .unwrap(),
                payment_method: PaymentMethod::MobilePayment,
                merchant_category: "travel".to_string(),
                is_fraud: true,
            }],
            customers: vec![Customer {
                customer_id: "CUST_000000".to_string(),
                age: 33.5,
                account_age_days: 120.0,
                credit_score: 690.0,
                income: 41000.0,
            }],
            merchants: vec![Merchant {
                merchant_id: "MERCH_00000".to_string(),
                merchant_name: "Harbor Supply".to_string(),
                category: "travel".to_string(),
                risk_score: 0.25,
                location: "Denver".to_string(),
            }],
        }
    }

    #[test]
    fn test_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let original = tables();
        original.save(tmp.path()).unwrap();

        let loaded = RawTables::load(tmp.path()).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_missing_table_is_data_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        match RawTables::load(tmp.path()) {
            Err(FraudError::DataNotFound { path }) => assert!(path.ends_with(TRANSACTIONS_FILE)),
            other => panic!("expected DataNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_reads_python_style_csv() {
        let tmp = tempfile::tempdir().unwrap();
        tables().save(tmp.path()).unwrap();

        let mut file = File::create(tmp.path().join(TRANSACTIONS_FILE)).unwrap();
        writeln!(
            file,
            "transaction_id,customer_id,merchant_id,amount,timestamp,payment_method,merchant_category,is_fraud"
        )
        .unwrap();
        writeln!(
            file,
            "TXN_00000000,CUST_000000,MERCH_00000,99.5,2024-02-03 23:41:07,credit_card,online,False"
        )
        .unwrap();
        drop(file);

        let loaded = RawTables::load(tmp.path()).unwrap();
        assert_eq!(loaded.transactions.len(), 1);
        assert!(!loaded.transactions[0].is_fraud);
        assert_eq!(loaded.transactions[0].hour_of_day(), 23);
    }

    #[test]
    fn test_feature_rows_join() {
        let rows = tables().feature_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.fraud_count(), 1);
        assert_eq!(
            rows.rows[0]["merchant_risk_score"].as_number().unwrap(),
            Some(0.25)
        );
    }
}
