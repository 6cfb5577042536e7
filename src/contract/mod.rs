//! Transaction functions and the host interfaces they run against.
//!
//! A contract receives a function name plus positional string arguments,
//! reads and writes its key space through a [`TxContext`], and answers with a
//! [`Response`]. Contracts never commit anything themselves: the host decides
//! whether the writes of a successful invocation become durable.

mod error;
mod ledger;
mod store;
mod voucher;

pub use error::*;
pub use ledger::*;
pub use store::*;
pub use voucher::*;

use serde::Serialize;

/// Status of a successful response.
pub const OK: i32 = 200;
/// Status the host and the contracts use for failures.
pub const ERROR: i32 = 500;
/// Any status at or above this value is a failure.
pub const ERROR_THRESHOLD: i32 = 400;

/// Outcome of invoking a contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: i32,
    pub message: String,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn success(payload: Vec<u8>) -> Self {
        Self {
            status: OK,
            message: String::new(),
            payload,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ERROR,
            message: message.into(),
            payload: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status < ERROR_THRESHOLD
    }

    /// Payload as text, for display and logging.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// State access plus synchronous calls into other contracts, scoped to one transaction.
pub trait TxContext: StateStore {
    /// Channel the current transaction runs on.
    fn channel(&self) -> &str;

    /// Invoke `function` on another contract within the same transaction.
    /// The call is fully resolved before this returns.
    fn invoke_contract(
        &mut self,
        contract: &str,
        function: &str,
        args: &[String],
        channel: &str,
    ) -> Response;
}

/// A deployable transaction function.
pub trait Contract: Send + Sync {
    fn invoke(&self, ctx: &mut dyn TxContext, function: &str, args: &[String]) -> Response;
}

/// Serialize a handler result into a response.
pub(crate) fn respond<T: Serialize>(result: Result<T, ContractError>) -> Response {
    match result {
        Ok(value) => match serde_json::to_vec(&value) {
            Ok(payload) => Response::success(payload),
            Err(e) => Response::error(format!("Failed to encode response: {}", e)),
        },
        Err(e) => {
            tracing::warn!(error = %e, "contract invocation rejected");
            Response::error(e.to_string())
        }
    }
}
