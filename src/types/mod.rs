//! Type definitions for the fraud detection platform

pub mod customer;
pub mod prediction;
pub mod transaction;

pub use customer::{Customer, Merchant};
pub use prediction::{Prediction, RiskTier};
pub use transaction::{MerchantCategory, PaymentMethod, Transaction};
