// Application layer - use cases and orchestration.
// Clients (CLI, tests, tools) go through LedgerService; contracts never see
// the database directly.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
