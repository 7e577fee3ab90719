//! Pluggable payment providers.
//!
//! Each external method maps to one [`PaymentProvider`] implementation held
//! in a [`ProviderRegistry`] that is built once at startup and injected into
//! the shop service. Resolution is a match on the [`PaymentMethod`] enum, so
//! every method/provider pairing is visible at compile time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use recommerce_core::{Cents, DomainError, DomainResult, PaymentId, UserId};

/// How a payment is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Balance/points only, no external provider.
    Balance,
    /// Redirect-wallet flow: `create` returns a pending charge the user
    /// approves out of band, then `execute` completes it.
    Redirect,
    /// Charge against a saved card.
    Card,
}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PaymentMethod::Balance => write!(f, "balance"),
            PaymentMethod::Redirect => write!(f, "redirect"),
            PaymentMethod::Card => write!(f, "card"),
        }
    }
}

/// A payment instrument the user saved earlier (e.g. a tokenized card).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMethod {
    pub method: PaymentMethod,
    /// Provider-side token/customer reference.
    pub reference: String,
}

/// What a provider is asked to charge.
#[derive(Debug)]
pub struct ChargeRequest<'a> {
    pub payment_id: PaymentId,
    pub user_id: UserId,
    /// The remainder after balance/point reservation, in cents.
    pub amount: Cents,
    pub saved_method: Option<&'a SavedMethod>,
}

/// Where the provider left the charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    /// Settled synchronously.
    Succeeded,
    /// Awaiting out-of-band approval (redirect flows).
    Pending,
}

/// Successful result of a provider call.
#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    pub status: ChargeStatus,
    pub vendor_payment_id: String,
    /// The provider's raw response payload, kept for audit.
    pub raw_response: Value,
}

/// One external payment method implementation.
///
/// Implementations must not hang: calls are expected to enforce their own
/// bounded timeout and surface any rejection or timeout as
/// [`DomainError::PaymentFailed`].
pub trait PaymentProvider: Send + Sync {
    /// Initiate a charge for the given amount.
    fn create(&self, request: &ChargeRequest<'_>) -> DomainResult<ChargeOutcome>;

    /// Complete a previously created pending charge (redirect flows only).
    fn execute(&self, vendor_payment_id: &str, payer_reference: &str) -> DomainResult<ChargeOutcome> {
        let _ = (vendor_payment_id, payer_reference);
        Err(DomainError::payment_failed(
            "payment method has no execute stage",
        ))
    }
}

/// Static method-to-provider mapping, passed in by the composition root.
///
/// `Balance` never resolves to a provider; the ledger covers it entirely.
#[derive(Default)]
pub struct ProviderRegistry {
    redirect: Option<Box<dyn PaymentProvider>>,
    card: Option<Box<dyn PaymentProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_redirect(mut self, provider: impl PaymentProvider + 'static) -> Self {
        self.redirect = Some(Box::new(provider));
        self
    }

    pub fn with_card(mut self, provider: impl PaymentProvider + 'static) -> Self {
        self.card = Some(Box::new(provider));
        self
    }

    pub fn provider(&self, method: PaymentMethod) -> Option<&dyn PaymentProvider> {
        match method {
            PaymentMethod::Balance => None,
            PaymentMethod::Redirect => self.redirect.as_deref(),
            PaymentMethod::Card => self.card.as_deref(),
        }
    }
}

impl core::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("redirect", &self.redirect.is_some())
            .field("card", &self.card.is_some())
            .finish()
    }
}

/// Structured view of a provider response.
///
/// Providers return arbitrary JSON; anything the core needs to reason about
/// is deserialized into this schema instead of being poked at dynamically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderReceipt {
    pub id: String,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub state: Option<String>,
}

impl ProviderReceipt {
    pub fn from_value(value: &Value) -> DomainResult<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| DomainError::payment_failed(format!("malformed provider response: {e}")))
    }
}
