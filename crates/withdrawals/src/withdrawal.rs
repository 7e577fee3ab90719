//! Withdrawal entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use recommerce_core::{
    Cents, DomainError, DomainResult, Entity, StatusGraph, StatusLabel, UserId, WithdrawalId,
};
use std::sync::LazyLock;

/// Where the cash goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalMethod {
    Paypal,
    Alipay,
    Other,
}

/// Withdrawal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Closed,
    Done,
}

impl StatusLabel for WithdrawalStatus {
    fn label(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Closed => "closed",
            WithdrawalStatus::Done => "done",
        }
    }
}

impl core::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

static GRAPH: LazyLock<StatusGraph<WithdrawalStatus>> = LazyLock::new(|| {
    use WithdrawalStatus::*;
    StatusGraph::new(
        "withdrawal",
        Pending,
        &[Pending, Closed, Done],
        &[(Pending, Closed), (Pending, Done)],
    )
    .expect("withdrawal status graph is statically valid")
});

impl WithdrawalStatus {
    /// The process-wide withdrawal transition graph.
    pub fn graph() -> &'static StatusGraph<WithdrawalStatus> {
        &GRAPH
    }
}

/// Side effects of a withdrawal status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalEffect {
    /// The request was closed: return the unprocessed part to the balance.
    RefundUnprocessed { amount: Cents },
}

/// A user's request to cash out balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    id: WithdrawalId,
    user_id: UserId,
    amount: Cents,
    processed_amount: Cents,
    method: WithdrawalMethod,
    /// Account identifier at the receiving vendor (e.g. a wallet email).
    pub vendor_account: String,
    status: WithdrawalStatus,
    created_at: DateTime<Utc>,
}

impl Withdrawal {
    /// Build a pending withdrawal. The caller debits `amount` from the
    /// user's balance atomically with persisting it.
    pub fn create(
        id: WithdrawalId,
        user_id: UserId,
        amount: Cents,
        method: WithdrawalMethod,
        vendor_account: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if amount == 0 {
            return Err(DomainError::validation("withdrawal amount must be positive"));
        }
        let vendor_account = vendor_account.into();
        if vendor_account.trim().is_empty() {
            return Err(DomainError::validation("vendor account is empty"));
        }
        Ok(Self {
            id,
            user_id,
            amount,
            processed_amount: 0,
            method,
            vendor_account,
            status: WithdrawalStatus::Pending,
            created_at: now,
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn amount(&self) -> Cents {
        self.amount
    }

    pub fn processed_amount(&self) -> Cents {
        self.processed_amount
    }

    pub fn method(&self) -> WithdrawalMethod {
        self.method
    }

    pub fn status(&self) -> WithdrawalStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Record how much was actually paid out. Validated before persistence:
    /// can never exceed the requested amount.
    pub fn set_processed_amount(&mut self, processed: Cents) -> DomainResult<()> {
        if processed > self.amount {
            return Err(DomainError::validation(
                "processed amount cannot be larger than amount",
            ));
        }
        self.processed_amount = processed;
        Ok(())
    }

    /// Request a status change. Closing refunds the unprocessed remainder;
    /// the refund cannot fire twice because `closed` is terminal and a
    /// same-status request is a no-op.
    pub fn transition(&mut self, dst: WithdrawalStatus) -> DomainResult<Vec<WithdrawalEffect>> {
        WithdrawalStatus::graph().check(self.status, dst)?;
        if self.status == dst {
            return Ok(Vec::new());
        }
        self.status = dst;

        let mut effects = Vec::new();
        if dst == WithdrawalStatus::Closed {
            let remainder = self.amount.saturating_sub(self.processed_amount);
            if remainder > 0 {
                effects.push(WithdrawalEffect::RefundUnprocessed { amount: remainder });
            }
        }
        Ok(effects)
    }
}

impl Entity for Withdrawal {
    type Id = WithdrawalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
