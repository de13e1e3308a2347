pub mod account;
pub mod constants;
pub mod error;
pub mod ledger_header;
pub mod stake;
pub mod transaction;
pub mod types;

pub use account::*;
pub use constants::*;
pub use error::NxfError;
pub use ledger_header::*;
pub use stake::*;
pub use transaction::*;
pub use types::*;
