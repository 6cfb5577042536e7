use serde::{Deserialize, Serialize};

use super::Amount;

/// Result of a query, issue or spend: the account and its balance afterwards.
/// Field names are part of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    #[serde(rename = "AccountID")]
    pub account_id: String,
    #[serde(rename = "AccountBalance")]
    pub balance: Amount,
}

impl TokenBalance {
    pub fn new(account_id: impl Into<String>, balance: Amount) -> Self {
        Self {
            account_id: account_id.into(),
            balance,
        }
    }
}

/// Result of a voucher exchange. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherGrant {
    #[serde(rename = "AccountID")]
    pub account_id: String,
    #[serde(rename = "CompanyID")]
    pub company_id: String,
    #[serde(rename = "SpendToken")]
    pub spend_token: Amount,
    #[serde(rename = "Voucher")]
    pub voucher: Amount,
}
