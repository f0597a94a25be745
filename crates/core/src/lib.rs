pub mod account;
pub mod money;
pub mod period;
pub mod transaction;

pub use account::{AccountMap, LedgerError, LedgerPath};
pub use money::Money;
pub use period::Month;
pub use transaction::{DateStyle, OutputRow, Transaction, ValidationWarning, OUTPUT_COLUMNS};
