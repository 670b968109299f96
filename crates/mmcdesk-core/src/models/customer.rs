use std::fmt;

use serde::{Deserialize, Serialize};

use super::{non_empty, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Inactive,
    Suspended,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "active",
            CustomerStatus::Inactive => "inactive",
            CustomerStatus::Suspended => "suspended",
        }
    }
}

/// Kind of identity document on file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum IdType {
    #[serde(rename = "身份证")]
    IdCard,
    #[serde(rename = "护照")]
    Passport,
    #[serde(rename = "其他")]
    Other,
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            IdType::IdCard => "身份证",
            IdType::Passport => "护照",
            IdType::Other => "其他",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub customer_id: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub id_type: IdType,
    #[serde(default)]
    pub id_number: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub address: String,
    pub risk_level: RiskLevel,
    pub status: CustomerStatus,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub wechat_id: Option<String>,
}

impl Customer {
    /// Family name first, as the console displays it.
    pub fn full_name(&self) -> String {
        format!("{}{}", self.last_name, self.first_name)
    }
}

/// Payload for creating or updating a customer. The optional login
/// account is created alongside the customer record when given.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub id_type: IdType,
    pub id_number: String,
    pub date_of_birth: String,
    pub address: String,
    pub risk_level: RiskLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CustomerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wechat_id: Option<String>,
}

impl CustomerInput {
    /// Drop optional fields left blank so they are omitted from the body.
    pub fn normalized(mut self) -> Self {
        self.username = non_empty(self.username);
        self.password = non_empty(self.password);
        self.remarks = non_empty(self.remarks);
        self.wechat_id = non_empty(self.wechat_id);
        self
    }
}

impl From<&Customer> for CustomerInput {
    fn from(c: &Customer) -> Self {
        Self {
            email: c.email.clone(),
            username: None,
            password: None,
            phone: c.phone.clone(),
            first_name: c.first_name.clone(),
            last_name: c.last_name.clone(),
            id_type: c.id_type,
            id_number: c.id_number.clone(),
            date_of_birth: c.date_of_birth.clone(),
            address: c.address.clone(),
            risk_level: c.risk_level,
            status: Some(c.status),
            remarks: c.remarks.clone(),
            wechat_id: c.wechat_id.clone(),
        }
    }
}
