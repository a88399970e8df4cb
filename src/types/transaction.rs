//! Transaction records as generated or ingested from the raw tables

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the customer paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    MobilePayment,
    BankTransfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::MobilePayment,
        PaymentMethod::BankTransfer,
    ];
}

/// Merchant category vocabulary used by the data generator.
///
/// Tables store the category as text, so values outside this list can still
/// be ingested and scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MerchantCategory {
    Grocery,
    Restaurant,
    GasStation,
    Retail,
    Online,
    Entertainment,
    Travel,
    Healthcare,
    Utilities,
    Other,
}

impl MerchantCategory {
    pub const ALL: [MerchantCategory; 10] = [
        MerchantCategory::Grocery,
        MerchantCategory::Restaurant,
        MerchantCategory::GasStation,
        MerchantCategory::Retail,
        MerchantCategory::Online,
        MerchantCategory::Entertainment,
        MerchantCategory::Travel,
        MerchantCategory::Healthcare,
        MerchantCategory::Utilities,
        MerchantCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MerchantCategory::Grocery => "grocery",
            MerchantCategory::Restaurant => "restaurant",
            MerchantCategory::GasStation => "gas_station",
            MerchantCategory::Retail => "retail",
            MerchantCategory::Online => "online",
            MerchantCategory::Entertainment => "entertainment",
            MerchantCategory::Travel => "travel",
            MerchantCategory::Healthcare => "healthcare",
            MerchantCategory::Utilities => "utilities",
            MerchantCategory::Other => "other",
        }
    }

    /// Parse a category label; `None` for labels outside the vocabulary.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == label)
    }
}

impl fmt::Display for MerchantCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single payment transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier
    pub transaction_id: String,

    pub customer_id: String,

    pub merchant_id: String,

    /// Amount in currency units, never negative
    pub amount: f64,

    /// Local wall-clock time of the transaction
    #[serde(with = "table_timestamp")]
    pub timestamp: NaiveDateTime,

    pub payment_method: PaymentMethod,

    /// Category of the merchant at the time of the transaction
    pub merchant_category: String,

    /// Ground-truth label
    #[serde(deserialize_with = "lenient_bool")]
    pub is_fraud: bool,
}

impl Transaction {
    /// Hour of day, 0-23
    pub fn hour_of_day(&self) -> u32 {
        self.timestamp.hour()
    }

    /// Day of week with Monday = 0 and Sunday = 6
    pub fn day_of_week(&self) -> u32 {
        self.timestamp.weekday().num_days_from_monday()
    }
}

/// Timestamps as `YYYY-MM-DD HH:MM:SS`; ISO `T`-separated values and
/// fractional seconds are accepted on input.
mod table_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}

/// Accepts `true`/`false` in any case as well as `1`/`0`
fn lenient_bool<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => Ok(b),
        Raw::Int(i) => Ok(i != 0),
        Raw::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid boolean {other:?}"))),
        },
    }
}
