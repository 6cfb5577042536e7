use thiserror::Error;

use crate::domain::Amount;

use super::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("Invalid Smart Contract function name: {0}")]
    UnknownFunction(String),

    #[error("Incorrect arguments: {0}")]
    Argument(String),

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Failed to parse stored balance of {key}: {value:?}")]
    StateCorruption { key: String, value: String },

    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: String,
        balance: Amount,
        requested: Amount,
    },

    #[error("Call to {contract}.{function} failed: {reason}")]
    Dependency {
        contract: String,
        function: String,
        reason: String,
    },

    #[error("Failed to access ledger state: {0}")]
    Persistence(#[from] StoreError),
}

/// Invalid contract configuration, detected before anything is invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Token to voucher rate must be positive, got {0}")]
    NonPositiveRate(Amount),

    #[error("Maximum voucher must not be negative, got {0}")]
    NegativeCap(Amount),

    #[error("{0} must not be empty")]
    EmptyName(&'static str),

    #[error("Unknown negative issuance policy: {0} (expected allow or reject)")]
    UnknownIssuancePolicy(String),
}
