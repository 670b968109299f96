use serde::{Deserialize, Serialize};

use super::non_empty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Purchase,
    Redeem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Card,
    Other,
}

impl TransactionType {
    pub const ALL: [TransactionType; 2] = [TransactionType::Purchase, TransactionType::Redeem];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Purchase => "purchase",
            TransactionType::Redeem => "redeem",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Purchase => "申购",
            TransactionType::Redeem => "赎回",
        }
    }
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 4] = [
        TransactionStatus::Pending,
        TransactionStatus::Confirmed,
        TransactionStatus::Completed,
        TransactionStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "待处理",
            TransactionStatus::Confirmed => "已确认",
            TransactionStatus::Completed => "已完成",
            TransactionStatus::Cancelled => "已取消",
        }
    }
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] =
        [PaymentMethod::BankTransfer, PaymentMethod::Card, PaymentMethod::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "银行转账",
            PaymentMethod::Card => "银行卡/信用卡",
            PaymentMethod::Other => "其他",
        }
    }
}

/// Label for a raw wire value: `-` when empty, the value itself when it
/// is not one we know.
fn label_for<T: Copy>(
    value: Option<&str>,
    all: &[T],
    as_str: fn(&T) -> &'static str,
    label: fn(&T) -> &'static str,
) -> String {
    match value.filter(|v| !v.is_empty()) {
        None => "-".to_string(),
        Some(raw) => all
            .iter()
            .find(|known| as_str(known) == raw)
            .map(|known| label(known).to_string())
            .unwrap_or_else(|| raw.to_string()),
    }
}

pub fn transaction_type_label(value: Option<&str>) -> String {
    label_for(value, &TransactionType::ALL, TransactionType::as_str, TransactionType::label)
}

pub fn transaction_status_label(value: Option<&str>) -> String {
    label_for(value, &TransactionStatus::ALL, TransactionStatus::as_str, TransactionStatus::label)
}

pub fn payment_method_label(value: Option<&str>) -> String {
    label_for(value, &PaymentMethod::ALL, PaymentMethod::as_str, PaymentMethod::label)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub transaction_status: Option<TransactionStatus>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub expected_maturity_date: Option<String>,
    #[serde(default)]
    pub actual_return_rate: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub customer_id: String,
    pub product_id: String,
    pub transaction_type: TransactionType,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_status: Option<TransactionStatus>,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_maturity_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_return_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl TransactionInput {
    /// Blank optionals dropped, and `totalAmount` filled in as
    /// `quantity * unitPrice` when not given.
    pub fn normalized(mut self) -> Self {
        self.expected_maturity_date = non_empty(self.expected_maturity_date);
        self.notes = non_empty(self.notes);
        self.completed_at = non_empty(self.completed_at);

        let computed = self.quantity * self.unit_price;
        if self.total_amount.is_none() && computed.is_finite() {
            self.total_amount = Some(computed);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(serde_json::to_value(PaymentMethod::BankTransfer).unwrap(), "bank_transfer");
        assert_eq!(serde_json::to_value(TransactionType::Redeem).unwrap(), "redeem");
        let status: TransactionStatus = serde_json::from_str(r#""cancelled""#).unwrap();
        assert_eq!(status, TransactionStatus::Cancelled);
    }

    #[test]
    fn test_labels_for_raw_values() {
        assert_eq!(transaction_type_label(Some("purchase")), "申购");
        assert_eq!(transaction_status_label(Some("completed")), "已完成");
        assert_eq!(payment_method_label(Some("card")), "银行卡/信用卡");
        assert_eq!(payment_method_label(Some("crypto")), "crypto");
        assert_eq!(transaction_status_label(Some("")), "-");
        assert_eq!(transaction_type_label(None), "-");
    }

    #[test]
    fn test_total_amount_is_computed_when_missing() {
        let input = TransactionInput {
            customer_id: "c-1".to_string(),
            product_id: "p-1".to_string(),
            transaction_type: TransactionType::Purchase,
            quantity: 3.0,
            unit_price: 1000.5,
            total_amount: None,
            transaction_status: None,
            payment_method: PaymentMethod::BankTransfer,
            expected_maturity_date: Some(String::new()),
            actual_return_rate: None,
            notes: Some("first purchase".to_string()),
            completed_at: None,
        };
        let body = serde_json::to_value(input.clone().normalized()).unwrap();
        assert_eq!(body["totalAmount"], 3001.5);
        assert!(body.get("expectedMaturityDate").is_none());
        assert!(body.get("transactionStatus").is_none());
        assert_eq!(body["notes"], "first purchase");

        let explicit = TransactionInput { total_amount: Some(2900.0), ..input }.normalized();
        assert_eq!(explicit.total_amount, Some(2900.0));
    }
}
