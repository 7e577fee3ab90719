//! Orders domain module.
//!
//! Business rules for purchase orders: the status lifecycle, totals and
//! coupon discounts, the shipping-address snapshot, and the side effects a
//! status change demands from its collaborators (catalog release, ledger
//! credits, payment refunds). No IO, no HTTP, no storage.

pub mod coupon;
pub mod order;
pub mod status;

pub use coupon::{Coupon, CouponKind};
pub use order::{Order, OrderEffect, OrderItem};
pub use status::OrderStatus;
