//! The `Shop` service: boundary operations over the shared state.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use recommerce_catalog::Product;
use recommerce_core::{
    Address, Cents, DomainError, DomainResult, OrderId, PaymentId, ProductId, SellRequestId,
    StatusChange, UserId, WithdrawalId,
};
use recommerce_events::{Mailbox, Notification, NotificationBus};
use recommerce_jobs::{DelayScheduler, WorkerPool};
use recommerce_ledger::{Account, PointsPolicy};
use recommerce_orders::{Coupon, Order, OrderItem, OrderStatus};
use recommerce_payments::{
    ChargeOutcome, ChargeRequest, ChargeStatus, Payment, PaymentMethod, PaymentStatus,
    ProviderReceipt, ProviderRegistry, SavedMethod, plan_reservation,
};
use recommerce_sellback::{ItemDetails, SellRequest, SellRequestStatus, SellType};
use recommerce_withdrawals::{Withdrawal, WithdrawalMethod, WithdrawalStatus};

use crate::config::ShopConfig;
use crate::state::ShopState;

/// What a payment settles: an existing order, or a balance top-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTarget {
    Order(OrderId),
    Recharge { amount: Cents },
}

/// Shared by the service, deferred jobs, and notification tasks.
struct Inner {
    state: Mutex<ShopState>,
    providers: ProviderRegistry,
    bus: Arc<NotificationBus>,
    policy: PointsPolicy,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ShopState> {
        self.state.lock().expect("shop state lock poisoned")
    }
}

/// The shop service.
///
/// All mutations run under one state mutex, which is the transaction
/// boundary: reserving products, computing totals and persisting the order
/// are one unit, as are debiting the ledger and persisting a payment.
/// Provider calls run outside the lock; notifications are dispatched
/// fire-and-forget on the worker pool after the lock is released.
pub struct Shop {
    inner: Arc<Inner>,
    // Declared before the pool so shutdown discards timers first.
    scheduler: DelayScheduler,
    pool: Arc<WorkerPool>,
    config: ShopConfig,
}

impl Shop {
    pub fn new(config: ShopConfig, providers: ProviderRegistry) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(ShopState::default()),
            providers,
            bus: Arc::new(NotificationBus::new()),
            policy: config.points,
        });
        let scheduler = DelayScheduler::new("shop-timer");
        let pool = Arc::new(WorkerPool::new("shop-worker", config.workers));
        Self {
            inner,
            scheduler,
            pool,
            config,
        }
    }

    /// Subscribe to the full notification stream (staff feeds, audit).
    pub fn subscribe(&self) -> Mailbox {
        self.inner.bus.subscribe()
    }

    /// Subscribe to one user's notifications (the mail-dispatch hook point).
    pub fn subscribe_user(&self, user_id: UserId) -> Mailbox {
        self.inner.bus.subscribe_user(user_id)
    }

    /// Stop background machinery: pending timers are discarded, queued
    /// notification work is drained.
    pub fn shutdown(self) {
        let Shop {
            inner,
            scheduler,
            pool,
            config: _,
        } = self;
        scheduler.shutdown();
        if let Ok(pool) = Arc::try_unwrap(pool) {
            pool.shutdown();
        }
        drop(inner);
    }

    // ----- setup -----

    pub fn register_user(&self) -> UserId {
        let user_id = UserId::new();
        self.inner
            .lock()
            .accounts
            .insert(user_id, Account::new(user_id));
        user_id
    }

    pub fn fund_account(&self, user_id: UserId, balance: Cents, points: u64) -> DomainResult<()> {
        let mut state = self.inner.lock();
        let account = state.account_mut(user_id)?;
        account.credit_balance(balance);
        account.credit_points(points);
        Ok(())
    }

    pub fn add_product(
        &self,
        brand: impl Into<String>,
        name: impl Into<String>,
        price: Cents,
    ) -> ProductId {
        let product_id = ProductId::new();
        self.inner
            .lock()
            .products
            .insert(product_id, Product::new(product_id, brand, name, price));
        product_id
    }

    pub fn add_coupon(&self, coupon: Coupon) {
        self.inner
            .lock()
            .coupons
            .insert(coupon.code.clone(), coupon);
    }

    pub fn save_payment_method(&self, user_id: UserId, saved: SavedMethod) {
        self.inner.lock().saved_methods.insert(user_id, saved);
    }

    // ----- reads -----

    pub fn account(&self, user_id: UserId) -> DomainResult<Account> {
        self.inner.lock().account_mut(user_id).map(|a| a.clone())
    }

    pub fn product(&self, product_id: ProductId) -> DomainResult<Product> {
        self.inner
            .lock()
            .products
            .get(&product_id)
            .cloned()
            .ok_or(DomainError::NotFound("product"))
    }

    pub fn order(&self, order_id: OrderId) -> DomainResult<Order> {
        self.inner.lock().order_mut(order_id).map(|o| o.clone())
    }

    pub fn payment(&self, payment_id: PaymentId) -> DomainResult<Payment> {
        self.inner.lock().payment_mut(payment_id).map(|p| p.clone())
    }

    pub fn sell_request(&self, id: SellRequestId) -> DomainResult<SellRequest> {
        self.inner.lock().sell_request_mut(id).map(|r| r.clone())
    }

    pub fn withdrawal(&self, id: WithdrawalId) -> DomainResult<Withdrawal> {
        self.inner.lock().withdrawal_mut(id).map(|w| w.clone())
    }

    /// Append-only transition history of an order.
    pub fn order_transition_log(
        &self,
        order_id: OrderId,
    ) -> DomainResult<Vec<StatusChange<OrderStatus>>> {
        self.inner
            .lock()
            .order_mut(order_id)
            .map(|o| o.transition_log().to_vec())
    }

    // ----- orders -----

    /// Checkout: reserve every product, compute totals, apply an optional
    /// coupon, snapshot the shipping address, and arm the unpaid timeout.
    ///
    /// All-or-nothing: if any product is already sold (or anything else
    /// fails), reservations made so far are rolled back and the error is
    /// returned. Two checkouts racing on the same product get exactly one
    /// winner.
    pub fn create_order(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
        shipping_address: Address,
        coupon_code: Option<&str>,
        comment: &str,
    ) -> DomainResult<OrderId> {
        let order_id = OrderId::new();
        let now = Utc::now();
        {
            let mut state = self.inner.lock();
            state.account_mut(user_id)?;
            let coupon = match coupon_code {
                Some(code) => Some(
                    state
                        .coupons
                        .get(code)
                        .cloned()
                        .ok_or(DomainError::NotFound("coupon"))?,
                ),
                None => None,
            };

            let mut items: Vec<OrderItem> = Vec::with_capacity(product_ids.len());
            let mut reserved: Vec<ProductId> = Vec::new();
            let mut failure: Option<DomainError> = None;
            for product_id in product_ids {
                match state.products.get_mut(product_id) {
                    Some(product) => match product.reserve() {
                        Ok(()) => {
                            reserved.push(*product_id);
                            items.push(OrderItem {
                                product_id: *product_id,
                                price: product.price,
                            });
                        }
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    },
                    None => {
                        failure = Some(DomainError::NotFound("product"));
                        break;
                    }
                }
            }

            let created = match failure {
                None => Order::create(
                    order_id,
                    user_id,
                    items,
                    shipping_address,
                    coupon.as_ref(),
                    comment,
                    now,
                ),
                Some(err) => Err(err),
            };
            let order = match created {
                Ok(order) => order,
                Err(err) => {
                    for product_id in reserved {
                        if let Some(product) = state.products.get_mut(&product_id) {
                            product.release();
                        }
                    }
                    return Err(err);
                }
            };
            state.orders.insert(order_id, order);
            info!(order = %order_id, user = %user_id, "order created");
        }

        self.schedule_order_timeout(order_id);
        self.dispatch(vec![Notification::OrderCreated {
            order_id,
            user_id,
            occurred_at: now,
        }]);
        Ok(order_id)
    }

    pub fn transition_order(&self, order_id: OrderId, dst: OrderStatus) -> DomainResult<()> {
        let now = Utc::now();
        let notifications = self
            .inner
            .lock()
            .transition_order(&self.inner.policy, order_id, dst, now)?;
        self.dispatch(notifications);
        Ok(())
    }

    pub fn set_order_comment(&self, order_id: OrderId, comment: &str) -> DomainResult<()> {
        self.inner.lock().order_mut(order_id)?.set_comment(comment)
    }

    pub fn set_order_tracking(
        &self,
        order_id: OrderId,
        express_company: &str,
        tracking_number: &str,
    ) -> DomainResult<()> {
        self.inner
            .lock()
            .order_mut(order_id)?
            .set_tracking(express_company, tracking_number)
    }

    // ----- payments -----

    /// Initiate a payment for an order or a balance recharge.
    ///
    /// Balance/point portions are planned against the current account and
    /// debited atomically with the payment's creation (pessimistic
    /// reservation). A zero remainder settles synchronously; otherwise the
    /// provider for `method` is called outside the lock, and a provider
    /// failure moves the payment to `failed`, which is what refunds the
    /// reservation. The order is left as it was so checkout can be retried.
    pub fn create_payment(
        &self,
        user_id: UserId,
        target: PaymentTarget,
        use_balance: bool,
        use_point: bool,
        method: PaymentMethod,
        billing_address: Address,
    ) -> DomainResult<PaymentId> {
        let payment_id = PaymentId::new();
        let now = Utc::now();

        let (remainder, saved_method) = {
            let mut state = self.inner.lock();
            let (order_id, amount_to_pay, use_balance, use_point) = match target {
                PaymentTarget::Order(order_id) => {
                    let order = state
                        .orders
                        .get(&order_id)
                        .ok_or(DomainError::NotFound("order"))?;
                    if order.user_id() != user_id {
                        return Err(DomainError::validation("order belongs to another user"));
                    }
                    if order.status() != OrderStatus::Unpaid {
                        return Err(DomainError::conflict("order is not awaiting payment"));
                    }
                    (Some(order_id), order.amount_to_pay(), use_balance, use_point)
                }
                PaymentTarget::Recharge { amount } => {
                    if amount == 0 {
                        return Err(DomainError::validation("recharge amount must be positive"));
                    }
                    // A recharge funds the balance, so it never draws on it.
                    (None, amount, false, false)
                }
            };

            let (points_available, balance_available) = {
                let account = state.account_mut(user_id)?;
                (account.points(), account.balance())
            };
            let plan = plan_reservation(
                &self.inner.policy,
                amount_to_pay,
                use_point,
                points_available,
                use_balance,
                balance_available,
            );
            let payment = Payment::create(
                payment_id,
                user_id,
                order_id,
                amount_to_pay,
                use_balance,
                use_point,
                plan,
                method,
                billing_address,
                now,
            )?;
            let account = state.account_mut(user_id)?;
            account.debit_points(plan.point_used)?;
            account.debit_balance(plan.amount_from_balance)?;
            state.payments.insert(payment_id, payment);
            info!(
                payment = %payment_id,
                user = %user_id,
                amount = amount_to_pay,
                remainder = plan.remainder,
                %method,
                "payment created"
            );

            if plan.remainder == 0 {
                let notifications =
                    state.settle_payment(&self.inner.policy, payment_id, PaymentStatus::Succeeded, now)?;
                drop(state);
                self.dispatch(notifications);
                return Ok(payment_id);
            }
            (plan.remainder, state.saved_methods.get(&user_id).cloned())
        };

        let result = match self.inner.providers.provider(method) {
            Some(provider) => provider.create(&ChargeRequest {
                payment_id,
                user_id,
                amount: remainder,
                saved_method: saved_method.as_ref(),
            }),
            None => Err(DomainError::payment_failed(format!(
                "no provider registered for method {method}"
            ))),
        };
        self.apply_charge_result(payment_id, result)?;
        Ok(payment_id)
    }

    /// Complete a pending redirect payment after the user approved it
    /// out of band.
    pub fn execute_payment(&self, payment_id: PaymentId, payer_reference: &str) -> DomainResult<()> {
        let now = Utc::now();
        let (method, vendor_payment_id) = {
            let mut state = self.inner.lock();
            let order_id = {
                let payment = state.payment_mut(payment_id)?;
                if payment.status() != PaymentStatus::Pending {
                    return Err(DomainError::conflict("payment is not pending"));
                }
                payment.order_id()
            };
            // The order may no longer accept a payment (user cancel, timeout
            // close). Don't complete the external charge for it; close the
            // payment instead so the reservation comes back.
            if let Some(order_id) = order_id {
                let order = state
                    .orders
                    .get(&order_id)
                    .ok_or(DomainError::NotFound("order"))?;
                if !OrderStatus::graph().allowed(order.status(), OrderStatus::Paid) {
                    let notifications = state.settle_payment(
                        &self.inner.policy,
                        payment_id,
                        PaymentStatus::Closed,
                        now,
                    )?;
                    drop(state);
                    self.dispatch(notifications);
                    return Err(DomainError::conflict("order is no longer payable"));
                }
            }
            let payment = state.payment_mut(payment_id)?;
            let vendor = payment
                .vendor_payment_id()
                .ok_or_else(|| DomainError::payment_failed("payment has no vendor reference"))?
                .to_owned();
            (payment.method(), vendor)
        };

        let result = match self.inner.providers.provider(method) {
            Some(provider) => provider.execute(&vendor_payment_id, payer_reference),
            None => Err(DomainError::payment_failed(format!(
                "no provider registered for method {method}"
            ))),
        };
        self.apply_charge_result(payment_id, result)
    }

    pub fn transition_payment(&self, payment_id: PaymentId, dst: PaymentStatus) -> DomainResult<()> {
        let now = Utc::now();
        let notifications = self
            .inner
            .lock()
            .settle_payment(&self.inner.policy, payment_id, dst, now)?;
        self.dispatch(notifications);
        Ok(())
    }

    /// Record a provider round trip: success settles the payment, a pending
    /// outcome arms the close-out timer, any failure (including a malformed
    /// response) moves the payment to `failed` and refunds the reservation.
    fn apply_charge_result(
        &self,
        payment_id: PaymentId,
        result: DomainResult<ChargeOutcome>,
    ) -> DomainResult<()> {
        let now = Utc::now();
        let outcome = result.and_then(|outcome| {
            ProviderReceipt::from_value(&outcome.raw_response).map(|_| outcome)
        });

        match outcome {
            Ok(outcome) => {
                let mut state = self.inner.lock();
                state
                    .payment_mut(payment_id)?
                    .record_vendor_result(outcome.vendor_payment_id, outcome.raw_response);
                match outcome.status {
                    ChargeStatus::Succeeded => {
                        let settled = state.settle_payment(
                            &self.inner.policy,
                            payment_id,
                            PaymentStatus::Succeeded,
                            now,
                        );
                        match settled {
                            Ok(notifications) => {
                                drop(state);
                                self.dispatch(notifications);
                            }
                            Err(err) => {
                                // The order moved on while the charge was in
                                // flight. Close the payment under the same
                                // lock so the reservation comes back.
                                warn!(
                                    payment = %payment_id,
                                    error = %err,
                                    "approved charge no longer applies"
                                );
                                let notifications = state.settle_payment(
                                    &self.inner.policy,
                                    payment_id,
                                    PaymentStatus::Closed,
                                    now,
                                )?;
                                drop(state);
                                self.dispatch(notifications);
                                return Err(err);
                            }
                        }
                    }
                    ChargeStatus::Pending => {
                        drop(state);
                        self.schedule_payment_timeout(payment_id);
                    }
                }
                Ok(())
            }
            Err(err) => {
                warn!(payment = %payment_id, error = %err, "charge failed");
                let notifications = self.inner.lock().settle_payment(
                    &self.inner.policy,
                    payment_id,
                    PaymentStatus::Failed,
                    now,
                )?;
                self.dispatch(notifications);
                Err(err)
            }
        }
    }

    // ----- sell requests -----

    pub fn create_sell_request(
        &self,
        user_id: UserId,
        details: ItemDetails,
    ) -> DomainResult<SellRequestId> {
        let id = SellRequestId::new();
        let now = Utc::now();
        {
            let mut state = self.inner.lock();
            state.account_mut(user_id)?;
            let request = SellRequest::create(id, user_id, details, now)?;
            state.sell_requests.insert(id, request);
            info!(sell_request = %id, user = %user_id, "sell request created");
        }
        self.dispatch(vec![Notification::SellRequestCreated {
            sell_request_id: id,
            user_id,
            occurred_at: now,
        }]);
        Ok(id)
    }

    /// Staff valuation: record the buy-back and/or consignment offers.
    pub fn valuate_sell_request(
        &self,
        id: SellRequestId,
        buy_back_valuation: Option<Cents>,
        sell_valuation: Option<Cents>,
    ) -> DomainResult<()> {
        let now = Utc::now();
        let notifications = {
            let mut state = self.inner.lock();
            let (user_id, from, to, effects) = {
                let request = state.sell_request_mut(id)?;
                let user_id = request.user_id();
                let from = request.status();
                let effects = request.valuate(buy_back_valuation, sell_valuation, now)?;
                (user_id, from, request.status(), effects)
            };
            state.finish_sell_request_change(id, user_id, from, to, effects, now)?
        };
        self.dispatch(notifications);
        Ok(())
    }

    /// The user accepts an offer: sell type, sender-address snapshot, and the
    /// move to `decided`, atomically.
    pub fn decide_sell_request(
        &self,
        id: SellRequestId,
        sell_type: SellType,
        sender_address: Address,
    ) -> DomainResult<()> {
        let now = Utc::now();
        let notifications = {
            let mut state = self.inner.lock();
            let (user_id, from, to, effects) = {
                let request = state.sell_request_mut(id)?;
                let user_id = request.user_id();
                let from = request.status();
                let effects = request.decide(sell_type, sender_address, now)?;
                (user_id, from, request.status(), effects)
            };
            state.finish_sell_request_change(id, user_id, from, to, effects, now)?
        };
        self.dispatch(notifications);
        Ok(())
    }

    pub fn transition_sell_request(
        &self,
        id: SellRequestId,
        dst: SellRequestStatus,
    ) -> DomainResult<()> {
        let now = Utc::now();
        let notifications = self.inner.lock().transition_sell_request(id, dst, now)?;
        self.dispatch(notifications);
        Ok(())
    }

    pub fn set_sell_request_tracking(
        &self,
        id: SellRequestId,
        express_company: &str,
        tracking_number: &str,
    ) -> DomainResult<()> {
        self.inner
            .lock()
            .sell_request_mut(id)?
            .set_tracking(express_company, tracking_number)
    }

    // ----- withdrawals -----

    /// Cash out part of the balance. The full amount is debited up front;
    /// closing the withdrawal later refunds whatever was not processed.
    pub fn create_withdrawal(
        &self,
        user_id: UserId,
        amount: Cents,
        method: WithdrawalMethod,
        vendor_account: &str,
    ) -> DomainResult<WithdrawalId> {
        let id = WithdrawalId::new();
        let now = Utc::now();
        {
            let mut state = self.inner.lock();
            let withdrawal = Withdrawal::create(id, user_id, amount, method, vendor_account, now)?;
            state.account_mut(user_id)?.debit_balance(amount)?;
            state.withdrawals.insert(id, withdrawal);
            info!(withdrawal = %id, user = %user_id, amount, "withdrawal created");
        }
        self.dispatch(vec![Notification::WithdrawalCreated {
            withdrawal_id: id,
            user_id,
            occurred_at: now,
        }]);
        Ok(id)
    }

    pub fn set_withdrawal_processed(&self, id: WithdrawalId, processed: Cents) -> DomainResult<()> {
        self.inner
            .lock()
            .withdrawal_mut(id)?
            .set_processed_amount(processed)
    }

    pub fn transition_withdrawal(&self, id: WithdrawalId, dst: WithdrawalStatus) -> DomainResult<()> {
        let now = Utc::now();
        let notifications = self.inner.lock().transition_withdrawal(id, dst, now)?;
        self.dispatch(notifications);
        Ok(())
    }

    // ----- background machinery -----

    fn schedule_order_timeout(&self, order_id: OrderId) {
        let inner = Arc::clone(&self.inner);
        let pool = Arc::clone(&self.pool);
        let armed = self
            .scheduler
            .schedule_after(self.config.order_timeout, move || {
                pool.submit(move || close_order_if_unpaid(&inner, order_id));
            });
        if !armed {
            warn!(order = %order_id, "scheduler unavailable, unpaid timeout not armed");
        }
    }

    fn schedule_payment_timeout(&self, payment_id: PaymentId) {
        let inner = Arc::clone(&self.inner);
        let pool = Arc::clone(&self.pool);
        let armed = self
            .scheduler
            .schedule_after(self.config.payment_timeout, move || {
                pool.submit(move || close_payment_if_pending(&inner, payment_id));
            });
        if !armed {
            warn!(payment = %payment_id, "scheduler unavailable, pending timeout not armed");
        }
    }

    /// Hand notifications to the worker pool. Best-effort: a delivery
    /// failure is logged and never affects the state change that produced
    /// the notification.
    fn dispatch(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            let bus = Arc::clone(&self.inner.bus);
            let submitted = self.pool.submit(move || {
                if let Err(err) = bus.publish(&notification) {
                    warn!(error = ?err, "notification delivery failed");
                }
            });
            if !submitted {
                warn!("worker pool unavailable, notification dropped");
            }
        }
    }
}

/// Deferred job: close an order that is still unpaid when its timeout fires.
fn close_order_if_unpaid(inner: &Inner, order_id: OrderId) {
    let now = Utc::now();
    let notifications = {
        let mut state = inner.lock();
        // Stale-state guard: the order may have moved on while the timer ran.
        match state.orders.get(&order_id) {
            Some(order) if order.status() == OrderStatus::Unpaid => {
                match state.transition_order(&inner.policy, order_id, OrderStatus::Closed, now) {
                    Ok(notifications) => {
                        info!(order = %order_id, "unpaid order closed on timeout");
                        notifications
                    }
                    Err(err) => {
                        error!(order = %order_id, error = %err, "timeout close failed");
                        Vec::new()
                    }
                }
            }
            _ => {
                debug!(order = %order_id, "order timeout no-op");
                Vec::new()
            }
        }
    };
    publish_all(inner, notifications);
}

/// Deferred job: close a payment that is still pending when its timeout
/// fires, refunding the reservation.
fn close_payment_if_pending(inner: &Inner, payment_id: PaymentId) {
    let now = Utc::now();
    let notifications = {
        let mut state = inner.lock();
        match state.payments.get(&payment_id) {
            Some(payment) if payment.status() == PaymentStatus::Pending => {
                match state.settle_payment(&inner.policy, payment_id, PaymentStatus::Closed, now) {
                    Ok(notifications) => {
                        info!(payment = %payment_id, "pending payment closed on timeout");
                        notifications
                    }
                    Err(err) => {
                        error!(payment = %payment_id, error = %err, "timeout close failed");
                        Vec::new()
                    }
                }
            }
            _ => {
                debug!(payment = %payment_id, "payment timeout no-op");
                Vec::new()
            }
        }
    };
    publish_all(inner, notifications);
}

fn publish_all(inner: &Inner, notifications: Vec<Notification>) {
    for notification in notifications {
        if let Err(err) = inner.bus.publish(&notification) {
            warn!(error = ?err, "notification delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            fullname: "Jane Roe".into(),
            phone_number: "555-0100".into(),
            country: "US".into(),
            street_address: "1 Main St".into(),
            city: "Springfield".into(),
            province: "IL".into(),
            zip_code: "62701".into(),
        }
    }

    fn shop() -> Shop {
        Shop::new(ShopConfig::default(), ProviderRegistry::new())
    }

    #[test]
    fn checkout_race_has_one_winner() {
        let shop = shop();
        let alice = shop.register_user();
        let bob = shop.register_user();
        let product = shop.add_product("Acme", "Tote", 3000);

        let first = shop.create_order(alice, &[product], address(), None, "");
        let second = shop.create_order(bob, &[product], address(), None, "");

        assert!(first.is_ok());
        assert!(matches!(second, Err(DomainError::AlreadySold)));
        shop.shutdown();
    }

    #[test]
    fn failed_checkout_rolls_back_reservations() {
        let shop = shop();
        let user = shop.register_user();
        let product = shop.add_product("Acme", "Tote", 3000);

        // Duplicate line item: the second reserve loses, the first unwinds.
        let result = shop.create_order(user, &[product, product], address(), None, "");
        assert!(matches!(result, Err(DomainError::AlreadySold)));
        assert!(!shop.product(product).unwrap().is_sold());

        // The product is still sellable afterwards.
        assert!(shop.create_order(user, &[product], address(), None, "").is_ok());
        shop.shutdown();
    }

    #[test]
    fn unknown_coupon_is_rejected_without_reserving() {
        let shop = shop();
        let user = shop.register_user();
        let product = shop.add_product("Acme", "Tote", 3000);

        let result = shop.create_order(user, &[product], address(), Some("NOPE"), "");
        assert!(matches!(result, Err(DomainError::NotFound("coupon"))));
        assert!(!shop.product(product).unwrap().is_sold());
        shop.shutdown();
    }

    #[test]
    fn recharge_credits_the_balance() {
        let shop = shop();
        let user = shop.register_user();
        shop.fund_account(user, 500, 0).unwrap();

        // Balance-method recharge with zero remainder is impossible, so a
        // recharge needs a provider; with none registered it must fail and
        // leave the balance untouched.
        let result = shop.create_payment(
            user,
            PaymentTarget::Recharge { amount: 2000 },
            true,
            true,
            PaymentMethod::Balance,
            address(),
        );
        assert!(matches!(result, Err(DomainError::PaymentFailed(_))));
        assert_eq!(shop.account(user).unwrap().balance(), 500);
        shop.shutdown();
    }

    #[test]
    fn balance_payment_with_insufficient_funds_fails_and_refunds() {
        let shop = shop();
        let user = shop.register_user();
        shop.fund_account(user, 1000, 0).unwrap();
        let product = shop.add_product("Acme", "Tote", 3000);
        let order_id = shop
            .create_order(user, &[product], address(), None, "")
            .unwrap();

        let result = shop.create_payment(
            user,
            PaymentTarget::Order(order_id),
            true,
            false,
            PaymentMethod::Balance,
            address(),
        );
        assert!(matches!(result, Err(DomainError::PaymentFailed(_))));
        // The reservation was refunded and the order is still payable.
        assert_eq!(shop.account(user).unwrap().balance(), 1000);
        assert_eq!(shop.order(order_id).unwrap().status(), OrderStatus::Unpaid);
        shop.shutdown();
    }
}
