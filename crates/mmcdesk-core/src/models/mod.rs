//! Wire models for the back-office REST API.
//!
//! - `AuthTokens`, `User`: sign-in payloads and the persisted session user
//! - `Customer`, `Product`, `Transaction`: resource records and their
//!   create/update inputs
//! - `Page`, `ListQuery`: paginated list envelope and its query parameters
//!
//! Enumerations keep the backend's wire values (several are Chinese words);
//! variant names are English.

pub mod auth;
pub mod customer;
pub mod page;
pub mod product;
pub mod transaction;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use auth::{
    AuthTokens, LoginRequest, RefreshRequest, RefreshedTokens, RegisterRequest,
    ResendVerificationRequest, User, VerifyRegistrationRequest,
};
pub use customer::{Customer, CustomerInput, CustomerStatus, IdType};
pub use page::{ListQuery, Page, SortOrder};
pub use product::{ExportLink, Product, ProductInput, ProductStatus, ProductType};
pub use transaction::{
    payment_method_label, transaction_status_label, transaction_type_label, PaymentMethod,
    Transaction, TransactionInput, TransactionStatus, TransactionType,
};

/// Risk grade shared by customers and products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum RiskLevel {
    #[serde(rename = "低")]
    Low,
    #[serde(rename = "中")]
    Medium,
    #[serde(rename = "高")]
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            RiskLevel::Low => "低",
            RiskLevel::Medium => "中",
            RiskLevel::High => "高",
        })
    }
}

/// `None` for missing or whitespace-only strings.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_wire_value() {
        assert_eq!(serde_json::to_value(RiskLevel::High).unwrap(), "高");
        let parsed: RiskLevel = serde_json::from_str(r#""低""#).unwrap();
        assert_eq!(parsed, RiskLevel::Low);
        assert!(serde_json::from_str::<RiskLevel>(r#""low""#).is_err());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(" \t".to_string())), None);
        assert_eq!(non_empty(Some("x".to_string())), Some("x".to_string()));
    }
}
