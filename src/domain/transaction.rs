use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TxId = Uuid;

/// A committed transaction, as kept in the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub tx_id: TxId,
    /// Commit sequence; also the version of every key the transaction wrote
    pub sequence: i64,
    /// Contract the client invoked (nested calls are not listed separately)
    pub contract: String,
    pub function: String,
    pub args: Vec<String>,
    /// Response payload returned to the client
    pub payload: String,
    pub committed_at: DateTime<Utc>,
}

impl TxRecord {
    /// Create a record for a transaction about to be committed.
    /// Sequence number must be assigned by the repository.
    pub fn new(
        contract: impl Into<String>,
        function: impl Into<String>,
        args: Vec<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            tx_id: Uuid::new_v4(),
            sequence: 0,
            contract: contract.into(),
            function: function.into(),
            args,
            payload: payload.into(),
            committed_at: Utc::now(),
        }
    }
}
