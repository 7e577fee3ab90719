//! The state held behind the shop's transaction mutex.
//!
//! Everything in this module runs with the lock held. Transition methods
//! mutate the entity, execute the side effects it demands against the rest of
//! the state, and return the notifications the caller should dispatch after
//! releasing the lock.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use recommerce_catalog::Product;
use recommerce_core::{
    DomainError, DomainResult, Entity, OrderId, PaymentId, ProductId, SellRequestId, StatusLabel,
    UserId, WithdrawalId,
};
use recommerce_events::Notification;
use recommerce_ledger::{Account, PointsPolicy};
use recommerce_orders::{Coupon, Order, OrderEffect, OrderStatus};
use recommerce_payments::{Payment, PaymentEffect, PaymentStatus, SavedMethod};
use recommerce_sellback::{SellRequest, SellRequestEffect, SellRequestStatus};
use recommerce_withdrawals::{Withdrawal, WithdrawalEffect, WithdrawalStatus};

#[derive(Default)]
pub(crate) struct ShopState {
    pub accounts: HashMap<UserId, Account>,
    pub products: HashMap<ProductId, Product>,
    pub orders: HashMap<OrderId, Order>,
    pub payments: HashMap<PaymentId, Payment>,
    pub sell_requests: HashMap<SellRequestId, SellRequest>,
    pub withdrawals: HashMap<WithdrawalId, Withdrawal>,
    pub coupons: HashMap<String, Coupon>,
    pub saved_methods: HashMap<UserId, SavedMethod>,
}

impl ShopState {
    pub fn account_mut(&mut self, user_id: UserId) -> DomainResult<&mut Account> {
        self.accounts
            .get_mut(&user_id)
            .ok_or(DomainError::NotFound("account"))
    }

    pub fn order_mut(&mut self, order_id: OrderId) -> DomainResult<&mut Order> {
        self.orders
            .get_mut(&order_id)
            .ok_or(DomainError::NotFound("order"))
    }

    pub fn payment_mut(&mut self, payment_id: PaymentId) -> DomainResult<&mut Payment> {
        self.payments
            .get_mut(&payment_id)
            .ok_or(DomainError::NotFound("payment"))
    }

    pub fn sell_request_mut(&mut self, id: SellRequestId) -> DomainResult<&mut SellRequest> {
        self.sell_requests
            .get_mut(&id)
            .ok_or(DomainError::NotFound("sell request"))
    }

    pub fn withdrawal_mut(&mut self, id: WithdrawalId) -> DomainResult<&mut Withdrawal> {
        self.withdrawals
            .get_mut(&id)
            .ok_or(DomainError::NotFound("withdrawal"))
    }

    /// Transition an order and execute the resulting side effects.
    pub fn transition_order(
        &mut self,
        policy: &PointsPolicy,
        order_id: OrderId,
        dst: OrderStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Notification>> {
        let (user_id, from, to, effects) = {
            let order = self.order_mut(order_id)?;
            let user_id = order.user_id();
            let from = order.status();
            let effects = order.transition(dst, now)?;
            (user_id, from, order.status(), effects)
        };

        let mut notifications = Vec::new();
        if from != to {
            notifications.push(Notification::OrderStatusChanged {
                order_id,
                user_id,
                from: from.label(),
                to: to.label(),
                occurred_at: now,
            });
        }
        self.apply_order_effects(policy, order_id, user_id, effects)?;
        Ok(notifications)
    }

    fn apply_order_effects(
        &mut self,
        policy: &PointsPolicy,
        order_id: OrderId,
        user_id: UserId,
        effects: Vec<OrderEffect>,
    ) -> DomainResult<()> {
        for effect in effects {
            match effect {
                OrderEffect::ReleaseProducts(product_ids) => {
                    for product_id in product_ids {
                        // Tolerate products removed from the catalog since
                        // checkout; release is idempotent.
                        if let Some(product) = self.products.get_mut(&product_id) {
                            product.release();
                        }
                    }
                }
                OrderEffect::RefundLastSucceededPayment => {
                    match self.last_succeeded_payment(order_id) {
                        Some(payment_id) => {
                            let (points, balance) = {
                                let payment = self.payment_mut(payment_id)?;
                                (payment.point_used(), payment.non_point_amount())
                            };
                            let account = self.account_mut(user_id)?;
                            account.credit_points(points);
                            account.credit_balance(balance);
                        }
                        None => {
                            warn!(order = %order_id, "no succeeded payment to refund");
                        }
                    }
                }
                OrderEffect::AwardPoints { paid_amount } => {
                    let earned = policy.earned(paid_amount);
                    self.account_mut(user_id)?.credit_points(earned);
                }
            }
        }
        Ok(())
    }

    fn last_succeeded_payment(&self, order_id: OrderId) -> Option<PaymentId> {
        self.payments
            .values()
            .filter(|p| p.order_id() == Some(order_id) && p.status() == PaymentStatus::Succeeded)
            .max_by_key(|p| (p.created_at(), *p.id().as_uuid()))
            .map(|p| *p.id())
    }

    /// Transition a payment and execute the resulting side effects,
    /// cascading to the owning order on success.
    pub fn settle_payment(
        &mut self,
        policy: &PointsPolicy,
        payment_id: PaymentId,
        dst: PaymentStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Notification>> {
        // Succeeding must also mark the owning order paid, so check that leg
        // before touching the payment. The order may have been cancelled or
        // closed while a charge was in flight; succeeding then would strand
        // the reservation against an order that can never accept it.
        if dst == PaymentStatus::Succeeded {
            let order_id = {
                let payment = self.payment_mut(payment_id)?;
                PaymentStatus::graph().check(payment.status(), dst)?;
                if payment.status() == dst {
                    None
                } else {
                    payment.order_id()
                }
            };
            if let Some(order_id) = order_id {
                let order = self
                    .orders
                    .get(&order_id)
                    .ok_or(DomainError::NotFound("order"))?;
                OrderStatus::graph().check(order.status(), OrderStatus::Paid)?;
            }
        }

        let (user_id, from, to, effects) = {
            let payment = self.payment_mut(payment_id)?;
            let user_id = payment.user_id();
            let from = payment.status();
            let effects = payment.transition(dst)?;
            (user_id, from, payment.status(), effects)
        };

        let mut notifications = Vec::new();
        if from != to {
            notifications.push(Notification::PaymentStatusChanged {
                payment_id,
                user_id,
                from: from.label(),
                to: to.label(),
                occurred_at: now,
            });
        }

        for effect in effects {
            match effect {
                PaymentEffect::MarkOrderPaid { order_id, amount } => {
                    let (order_from, order_to, order_effects) = {
                        let order = self.order_mut(order_id)?;
                        let order_from = order.status();
                        let order_effects = order.record_paid(amount, now)?;
                        (order_from, order.status(), order_effects)
                    };
                    if order_from != order_to {
                        notifications.push(Notification::OrderStatusChanged {
                            order_id,
                            user_id,
                            from: order_from.label(),
                            to: order_to.label(),
                            occurred_at: now,
                        });
                    }
                    self.apply_order_effects(policy, order_id, user_id, order_effects)?;
                }
                PaymentEffect::CreditRecharge { amount } => {
                    self.account_mut(user_id)?.credit_balance(amount);
                }
                PaymentEffect::RefundReservation { points, balance } => {
                    let account = self.account_mut(user_id)?;
                    account.credit_points(points);
                    account.credit_balance(balance);
                }
            }
        }
        Ok(notifications)
    }

    /// Transition a sell request and execute the resulting side effects.
    pub fn transition_sell_request(
        &mut self,
        id: SellRequestId,
        dst: SellRequestStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Notification>> {
        let (user_id, from, to, effects) = {
            let request = self.sell_request_mut(id)?;
            let user_id = request.user_id();
            let from = request.status();
            let effects = request.transition(dst, now)?;
            (user_id, from, request.status(), effects)
        };
        self.finish_sell_request_change(id, user_id, from, to, effects, now)
    }

    /// Shared tail for decide/valuate/transition: side effects + notification.
    pub fn finish_sell_request_change(
        &mut self,
        id: SellRequestId,
        user_id: UserId,
        from: SellRequestStatus,
        to: SellRequestStatus,
        effects: Vec<SellRequestEffect>,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Notification>> {
        let mut notifications = Vec::new();
        if from != to {
            notifications.push(Notification::SellRequestStatusChanged {
                sell_request_id: id,
                user_id,
                from: from.label(),
                to: to.label(),
                occurred_at: now,
            });
        }
        for effect in effects {
            match effect {
                SellRequestEffect::CreditSale { amount } => {
                    self.account_mut(user_id)?.credit_balance(amount);
                }
            }
        }
        Ok(notifications)
    }

    /// Transition a withdrawal and execute the resulting side effects.
    pub fn transition_withdrawal(
        &mut self,
        id: WithdrawalId,
        dst: WithdrawalStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Notification>> {
        let (user_id, from, to, effects) = {
            let withdrawal = self.withdrawal_mut(id)?;
            let user_id = withdrawal.user_id();
            let from = withdrawal.status();
            let effects = withdrawal.transition(dst)?;
            (user_id, from, withdrawal.status(), effects)
        };

        let mut notifications = Vec::new();
        if from != to {
            notifications.push(Notification::WithdrawalStatusChanged {
                withdrawal_id: id,
                user_id,
                from: from.label(),
                to: to.label(),
                occurred_at: now,
            });
        }
        for effect in effects {
            match effect {
                WithdrawalEffect::RefundUnprocessed { amount } => {
                    self.account_mut(user_id)?.credit_balance(amount);
                }
            }
        }
        Ok(notifications)
    }
}
