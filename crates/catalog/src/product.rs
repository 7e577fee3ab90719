//! Product: one physical item with a sold-flag reservation guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use recommerce_core::{Cents, DomainError, DomainResult, Entity, ProductId};

/// A catalog item.
///
/// `price` is the current listing price; orders copy it into their items at
/// checkout (strike price), so later price edits never change an existing
/// order's total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    pub brand: String,
    pub name: String,
    pub price: Cents,
    sold: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(id: ProductId, brand: impl Into<String>, name: impl Into<String>, price: Cents) -> Self {
        Self {
            id,
            brand: brand.into(),
            name: name.into(),
            price,
            sold: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_sold(&self) -> bool {
        self.sold
    }

    /// Mark the product sold, failing if it already is.
    ///
    /// This is the update-if-unsold guard: two checkouts racing on the same
    /// item must run this under the same transaction boundary, and exactly
    /// one of them wins.
    pub fn reserve(&mut self) -> DomainResult<()> {
        if self.sold {
            return Err(DomainError::AlreadySold);
        }
        self.sold = true;
        Ok(())
    }

    /// Put the product back on sale (inverse of [`reserve`](Self::reserve)).
    ///
    /// Idempotent: releasing an unsold product is a no-op, so cancel and
    /// close side effects are safe to re-run.
    pub fn release(&mut self) {
        self.sold = false;
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_wins_once() {
        let mut product = Product::new(ProductId::new(), "Acme", "Tote", 12_000);
        assert!(product.reserve().is_ok());
        assert!(matches!(product.reserve(), Err(DomainError::AlreadySold)));
        assert!(product.is_sold());
    }

    #[test]
    fn release_is_idempotent() {
        let mut product = Product::new(ProductId::new(), "Acme", "Tote", 12_000);
        product.reserve().unwrap();
        product.release();
        product.release();
        assert!(!product.is_sold());
        assert!(product.reserve().is_ok());
    }
}
