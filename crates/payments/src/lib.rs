//! Payments domain module.
//!
//! A `Payment` is one attempt to settle an order (or recharge a balance).
//! Balance/point portions are reserved eagerly at creation; anything left is
//! delegated to a pluggable [`PaymentProvider`] resolved through a statically
//! typed [`ProviderRegistry`] (no runtime string registration).

pub mod payment;
pub mod provider;
pub mod status;

pub use payment::{Payment, PaymentEffect, ReservePlan, plan_reservation};
pub use provider::{
    ChargeOutcome, ChargeRequest, ChargeStatus, PaymentMethod, PaymentProvider, ProviderReceipt,
    ProviderRegistry, SavedMethod,
};
pub use status::PaymentStatus;
