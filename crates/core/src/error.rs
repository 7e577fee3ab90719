//! Domain error model.

use thiserror::Error;

use crate::money::Cents;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Which ledger account a debit was attempted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundKind {
    Balance,
    Point,
}

impl core::fmt::Display for FundKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FundKind::Balance => write!(f, "balance"),
            FundKind::Point => write!(f, "point"),
        }
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic business failures. `Configuration` is
/// the one exception: it is only produced while wiring up static structures
/// (status graphs) and is fatal at startup, never at request time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The requested status is not reachable from the current status.
    #[error("illegal transition for {entity}: {from} -> {to}")]
    IllegalTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },

    /// A ledger debit exceeds the available balance or points.
    /// Rejected before any mutation.
    #[error("insufficient {kind}: requested {requested}, available {available}")]
    InsufficientFunds {
        kind: FundKind,
        requested: Cents,
        available: Cents,
    },

    /// Provider-side rejection of a payment attempt.
    #[error("payment failed: {0}")]
    PaymentFailed(String),

    /// Race loser on checkout: the product was reserved by a concurrent order.
    /// Callers should treat this as "unavailable", not as a system error.
    #[error("product is already sold")]
    AlreadySold,

    /// Malformed static wiring (e.g. a status graph edge referencing a status
    /// outside the declared set).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested entity was not found (domain-level).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A conflict occurred (e.g. duplicate creation).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn payment_failed(msg: impl Into<String>) -> Self {
        Self::PaymentFailed(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
