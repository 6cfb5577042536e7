mod ledger;
mod money;
mod records;
mod transaction;
mod voucher;

pub use ledger::*;
pub use money::*;
pub use records::*;
pub use transaction::*;
pub use voucher::*;
