//! Notification payloads published on entity creation and status changes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use recommerce_core::id::{OrderId, PaymentId, SellRequestId, UserId, WithdrawalId};

use crate::event::Event;

/// A notification about something that happened in the shop.
///
/// Status labels are carried as `&'static str` (the canonical kebab-case
/// labels of the entity's status enum) so this crate stays independent of
/// the domain crates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Notification {
    OrderCreated {
        order_id: OrderId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    OrderStatusChanged {
        order_id: OrderId,
        user_id: UserId,
        from: &'static str,
        to: &'static str,
        occurred_at: DateTime<Utc>,
    },
    PaymentStatusChanged {
        payment_id: PaymentId,
        user_id: UserId,
        from: &'static str,
        to: &'static str,
        occurred_at: DateTime<Utc>,
    },
    SellRequestCreated {
        sell_request_id: SellRequestId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    SellRequestStatusChanged {
        sell_request_id: SellRequestId,
        user_id: UserId,
        from: &'static str,
        to: &'static str,
        occurred_at: DateTime<Utc>,
    },
    WithdrawalCreated {
        withdrawal_id: WithdrawalId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    WithdrawalStatusChanged {
        withdrawal_id: WithdrawalId,
        user_id: UserId,
        from: &'static str,
        to: &'static str,
        occurred_at: DateTime<Utc>,
    },
}

impl Notification {
    /// The user the notification is addressed to.
    pub fn user_id(&self) -> UserId {
        match self {
            Self::OrderCreated { user_id, .. }
            | Self::OrderStatusChanged { user_id, .. }
            | Self::PaymentStatusChanged { user_id, .. }
            | Self::SellRequestCreated { user_id, .. }
            | Self::SellRequestStatusChanged { user_id, .. }
            | Self::WithdrawalCreated { user_id, .. }
            | Self::WithdrawalStatusChanged { user_id, .. } => *user_id,
        }
    }
}

impl Event for Notification {
    fn event_type(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order.created",
            Self::OrderStatusChanged { .. } => "order.status_changed",
            Self::PaymentStatusChanged { .. } => "payment.status_changed",
            Self::SellRequestCreated { .. } => "sell_request.created",
            Self::SellRequestStatusChanged { .. } => "sell_request.status_changed",
            Self::WithdrawalCreated { .. } => "withdrawal.created",
            Self::WithdrawalStatusChanged { .. } => "withdrawal.status_changed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::OrderCreated { occurred_at, .. }
            | Self::OrderStatusChanged { occurred_at, .. }
            | Self::PaymentStatusChanged { occurred_at, .. }
            | Self::SellRequestCreated { occurred_at, .. }
            | Self::SellRequestStatusChanged { occurred_at, .. }
            | Self::WithdrawalCreated { occurred_at, .. }
            | Self::WithdrawalStatusChanged { occurred_at, .. } => *occurred_at,
        }
    }
}
