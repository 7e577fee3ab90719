//! Postal address value object.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A postal address.
///
/// The same shape serves as a live user address and as the point-in-time
/// snapshot stored on orders (shipping), payments (billing) and sell requests
/// (sender). Snapshotting is a plain field-by-field copy: clone the value at
/// creation time and later edits to the user's saved address cannot leak into
/// historical records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub fullname: String,
    pub phone_number: String,
    pub country: String,
    pub street_address: String,
    pub city: String,
    pub province: String,
    pub zip_code: String,
}

impl Address {
    /// Validate the minimal fields a deliverable address needs.
    pub fn validate(&self) -> DomainResult<()> {
        if self.fullname.trim().is_empty() {
            return Err(DomainError::validation("address fullname is empty"));
        }
        if self.street_address.trim().is_empty() {
            return Err(DomainError::validation("address street is empty"));
        }
        Ok(())
    }
}

impl ValueObject for Address {}
