//! Product catalog domain module.
//!
//! Products here are single physical items (second-hand goods), so "stock"
//! is a boolean: an item is either available or sold. Checkout reserves it;
//! cancellation releases it.

pub mod product;

pub use product::Product;
