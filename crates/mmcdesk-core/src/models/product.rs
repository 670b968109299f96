use std::fmt;

use serde::{Deserialize, Serialize};

use super::{non_empty, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ProductType {
    #[serde(rename = "理财")]
    Wealth,
    #[serde(rename = "基金")]
    Fund,
    #[serde(rename = "债券")]
    Bond,
    #[serde(rename = "保险")]
    Insurance,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Wealth => "理财",
            ProductType::Fund => "基金",
            ProductType::Bond => "债券",
            ProductType::Insurance => "保险",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Known product states. The backend may add more, so `Product::status`
/// stays a string; use [`ProductStatus::parse`] to interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    Active,
    Inactive,
    Suspended,
}

impl ProductStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(ProductStatus::Active),
            "inactive" => Some(ProductStatus::Inactive),
            "suspended" => Some(ProductStatus::Suspended),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: String,
    pub product_name: String,
    pub product_type: ProductType,
    #[serde(default)]
    pub description: Option<String>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub min_investment: f64,
    #[serde(default)]
    pub max_investment: f64,
    /// Annualised, in percent
    #[serde(default)]
    pub expected_return: f64,
    #[serde(default)]
    pub interest_payment_date: String,
    /// Term in days
    #[serde(default)]
    pub maturity_period: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub sales_start_date: String,
    #[serde(default)]
    pub sales_end_date: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub created_by: String,
}

impl Product {
    pub fn known_status(&self) -> Option<ProductStatus> {
        ProductStatus::parse(&self.status)
    }

    /// Whether `amount` is within the product's investment bounds.
    /// A zero maximum means no upper bound.
    pub fn accepts_amount(&self, amount: f64) -> bool {
        amount >= self.min_investment && (self.max_investment <= 0.0 || amount <= self.max_investment)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub product_name: String,
    pub product_type: ProductType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub risk_level: RiskLevel,
    pub min_investment: f64,
    pub max_investment: f64,
    pub expected_return: f64,
    pub interest_payment_date: String,
    pub maturity_period: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_end_date: Option<String>,
}

impl ProductInput {
    pub fn normalized(mut self) -> Self {
        self.description = non_empty(self.description);
        self.sales_start_date = non_empty(self.sales_start_date);
        self.sales_end_date = non_empty(self.sales_end_date);
        self
    }
}

/// Download link for a product export generated server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ExportLink {
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub expire_at: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub object_key: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub size: u64,
}

impl ExportLink {
    /// File name to save as, falling back to `products.xlsx`.
    pub fn file_name_or_default(&self) -> &str {
        if self.file_name.is_empty() {
            "products.xlsx"
        } else {
            &self.file_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product_with_unknown_status() {
        let json = r#"{
            "productId": "p-9",
            "productName": "稳健增利 1 号",
            "productType": "理财",
            "riskLevel": "低",
            "minInvestment": 10000,
            "maxInvestment": 0,
            "expectedReturn": 3.2,
            "interestPaymentDate": "每月 20 日",
            "maturityPeriod": 180,
            "status": "presale",
            "salesStartDate": "2024-06-01",
            "salesEndDate": "2024-06-30",
            "createdAt": "2024-05-01T08:00:00Z",
            "updatedAt": "2024-05-01T08:00:00Z",
            "createdBy": "amy"
        }"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.product_type, ProductType::Wealth);
        assert_eq!(p.known_status(), None);
        assert!(p.accepts_amount(50_000.0));
        assert!(!p.accepts_amount(5_000.0));
    }

    #[test]
    fn test_export_file_name_fallback() {
        let link: ExportLink =
            serde_json::from_str(r#"{"downloadUrl":"https://oss.local/x.xlsx"}"#).unwrap();
        assert_eq!(link.file_name_or_default(), "products.xlsx");
    }
}
