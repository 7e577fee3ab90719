//! Withdrawals domain module.
//!
//! A `Withdrawal` cashes out part of a user's balance. The full amount is
//! debited up front; closing the request refunds whatever was not actually
//! processed.

pub mod withdrawal;

pub use withdrawal::{Withdrawal, WithdrawalEffect, WithdrawalMethod, WithdrawalStatus};
