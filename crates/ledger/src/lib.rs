//! Balance/point ledger.
//!
//! Per-user account primitives. The state machines mutate accounts solely
//! through the credit/debit operations here; the API layer never writes
//! balances directly.

pub mod account;
pub mod points;

pub use account::Account;
pub use points::PointsPolicy;
