//! Shop orchestration boundary.
//!
//! [`Shop`] owns the in-memory shop state behind a single mutex (the
//! transaction boundary), the provider registry, the notification bus, and
//! the background machinery for deferred timeouts. Every mutation that
//! touches the ledger and cascades to related entities runs while holding the
//! state lock, so it is all-or-nothing with respect to concurrent callers.
//! External provider calls happen outside the lock.

pub mod config;
pub mod service;

mod state;

pub use config::ShopConfig;
pub use service::{PaymentTarget, Shop};
