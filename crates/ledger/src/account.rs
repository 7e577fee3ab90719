//! Per-user balance and point account.

use serde::{Deserialize, Serialize};
use tracing::debug;

use recommerce_core::{Cents, DomainError, DomainResult, Entity, FundKind, UserId};

/// A user's ledger account: currency balance (cents) plus loyalty points.
///
/// Both quantities are unsigned, so the at-rest invariant (balance >= 0,
/// points >= 0) holds by construction; debits check sufficiency first and
/// reject with [`DomainError::InsufficientFunds`] before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    user_id: UserId,
    balance: Cents,
    points: u64,
}

impl Account {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: 0,
            points: 0,
        }
    }

    pub fn with_funds(user_id: UserId, balance: Cents, points: u64) -> Self {
        Self {
            user_id,
            balance,
            points,
        }
    }

    pub fn balance(&self) -> Cents {
        self.balance
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn credit_balance(&mut self, amount: Cents) {
        self.balance += amount;
        debug!(user = %self.user_id, amount, balance = self.balance, "balance credited");
    }

    pub fn debit_balance(&mut self, amount: Cents) -> DomainResult<()> {
        if amount > self.balance {
            return Err(DomainError::InsufficientFunds {
                kind: FundKind::Balance,
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        debug!(user = %self.user_id, amount, balance = self.balance, "balance debited");
        Ok(())
    }

    pub fn credit_points(&mut self, points: u64) {
        self.points += points;
        debug!(user = %self.user_id, points, total = self.points, "points credited");
    }

    pub fn debit_points(&mut self, points: u64) -> DomainResult<()> {
        if points > self.points {
            return Err(DomainError::InsufficientFunds {
                kind: FundKind::Point,
                requested: points,
                available: self.points,
            });
        }
        self.points -= points;
        debug!(user = %self.user_id, points, total = self.points, "points debited");
        Ok(())
    }
}

impl Entity for Account {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.user_id
    }
}
