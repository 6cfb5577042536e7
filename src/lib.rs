pub mod application;
pub mod cli;
pub mod contract;
pub mod domain;
pub mod host;
pub mod io;
pub mod storage;

pub use domain::*;
pub use storage::Repository;
