//! Sell-back/consignment domain module.
//!
//! A `SellRequest` is a user proposing to sell an item to the shop (buy-back)
//! or through it (consignment). The lifecycle mirrors the order pattern:
//! a status graph, pure transition methods, and side effects handed to the
//! orchestration layer.

pub mod sell_request;
pub mod status;

pub use sell_request::{ItemDetails, SellRequest, SellRequestEffect, SellType};
pub use status::SellRequestStatus;
