//! `recommerce-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the error model, strongly-typed identifiers, money primitives, the address
//! value object, and the status transition graph shared by every lifecycle
//! entity in the shop.

pub mod address;
pub mod entity;
pub mod error;
pub mod graph;
pub mod id;
pub mod money;
pub mod value_object;

pub use address::Address;
pub use entity::Entity;
pub use error::{DomainError, DomainResult, FundKind};
pub use graph::{StatusChange, StatusGraph, StatusLabel};
pub use id::{OrderId, PaymentId, ProductId, SellRequestId, UserId, WithdrawalId};
pub use money::Cents;
pub use value_object::ValueObject;
