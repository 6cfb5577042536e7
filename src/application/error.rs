use thiserror::Error;

use crate::contract::ConfigError;
use crate::host::CommitError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{contract}.{function} failed (status {status}): {message}")]
    Rejected {
        contract: String,
        function: String,
        status: i32,
        message: String,
    },

    #[error("Transaction conflicted with a concurrent commit, resubmit it: {0}")]
    MvccConflict(CommitError),

    #[error("Corrupted balance record for {account}: {value:?}")]
    CorruptBalance { account: String, value: String },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Invalid response payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
