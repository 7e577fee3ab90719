//! Order entity and its transition side effects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use recommerce_core::{
    Address, Cents, DomainError, DomainResult, Entity, OrderId, ProductId, StatusChange, UserId,
};

use crate::coupon::Coupon;
use crate::status::OrderStatus;

/// One line of an order: the product and the price frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    /// Strike price: copied from the catalog at order creation, decoupled
    /// from later listing-price changes.
    pub price: Cents,
}

/// Side effects a successful order transition demands from the caller.
///
/// The order itself stays pure; the orchestration layer executes these inside
/// the same transaction boundary as the status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEffect {
    /// Put the listed products back on sale (cancel/close).
    ReleaseProducts(Vec<ProductId>),
    /// The order was paid when cancelled: refund the most recent succeeded
    /// payment's point portion and non-point monetary portion.
    RefundLastSucceededPayment,
    /// Order completed: award points as a function of the paid amount.
    AwardPoints { paid_amount: Cents },
}

/// A purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    total_price: Cents,
    discount_amount: Cents,
    paid_amount: Cents,
    comment: String,
    status: OrderStatus,
    last_status: Option<OrderStatus>,
    created_at: DateTime<Utc>,
    shipping_address: Address,
    items: Vec<OrderItem>,
    pub express_company: Option<String>,
    pub tracking_number: Option<String>,
    transitions: Vec<StatusChange<OrderStatus>>,
}

impl Order {
    /// Assemble a new order from already-reserved items.
    ///
    /// `total_price` is the sum of item strike prices; at most one coupon
    /// applies, per its own rate/flat rule. The shipping address is stored as
    /// a snapshot (owned copy).
    ///
    /// Product reservation is the caller's job, atomic with this call.
    pub fn create(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: Address,
        coupon: Option<&Coupon>,
        comment: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("order must have at least one item"));
        }
        shipping_address.validate()?;

        let total_price: Cents = items.iter().map(|item| item.price).sum();
        let discount_amount = coupon
            .filter(|c| c.is_valid)
            .map(|c| c.discount_amount(total_price))
            .unwrap_or(0);

        Ok(Self {
            id,
            user_id,
            total_price,
            discount_amount,
            paid_amount: 0,
            comment: comment.into(),
            status: OrderStatus::Unpaid,
            last_status: None,
            created_at: now,
            shipping_address,
            items,
            express_company: None,
            tracking_number: None,
            transitions: Vec::new(),
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn last_status(&self) -> Option<OrderStatus> {
        self.last_status
    }

    pub fn total_price(&self) -> Cents {
        self.total_price
    }

    pub fn discount_amount(&self) -> Cents {
        self.discount_amount
    }

    /// What a payment for this order must settle.
    pub fn amount_to_pay(&self) -> Cents {
        self.total_price - self.discount_amount
    }

    pub fn paid_amount(&self) -> Cents {
        self.paid_amount
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    /// Append-only record of every status change.
    pub fn transition_log(&self) -> &[StatusChange<OrderStatus>] {
        &self.transitions
    }

    fn product_ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|item| item.product_id).collect()
    }

    /// Request a status change.
    ///
    /// Rejected with [`DomainError::IllegalTransition`] unless the order
    /// graph has the edge. A same-status request is a legal no-op: nothing is
    /// logged and no side effects fire (side effects are driven by actual
    /// change, never by invocation count).
    pub fn transition(
        &mut self,
        dst: OrderStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<OrderEffect>> {
        OrderStatus::graph().check(self.status, dst)?;
        if self.status == dst {
            return Ok(Vec::new());
        }

        let src = self.status;
        self.last_status = Some(src);
        self.status = dst;
        self.transitions.push(StatusChange {
            from: src,
            to: dst,
            at: now,
        });

        let mut effects = Vec::new();
        match dst {
            OrderStatus::Cancelled | OrderStatus::Closed => {
                effects.push(OrderEffect::ReleaseProducts(self.product_ids()));
                let was_paid = matches!(src, OrderStatus::Paid | OrderStatus::Cancelling);
                if dst == OrderStatus::Cancelled && was_paid {
                    effects.push(OrderEffect::RefundLastSucceededPayment);
                }
            }
            OrderStatus::Done => {
                // Re-entering done from return-requested must not double-award.
                if src != OrderStatus::ReturnRequested {
                    effects.push(OrderEffect::AwardPoints {
                        paid_amount: self.paid_amount,
                    });
                }
            }
            _ => {}
        }
        Ok(effects)
    }

    /// Record a succeeded payment: marks the order paid.
    pub fn record_paid(
        &mut self,
        amount: Cents,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<OrderEffect>> {
        let effects = self.transition(OrderStatus::Paid, now)?;
        self.paid_amount = amount;
        Ok(effects)
    }

    /// The comment is editable only while the order is unpaid or paid.
    pub fn set_comment(&mut self, comment: impl Into<String>) -> DomainResult<()> {
        match self.status {
            OrderStatus::Unpaid | OrderStatus::Paid => {
                self.comment = comment.into();
                Ok(())
            }
            _ => Err(DomainError::validation(
                "comment is only editable while unpaid or paid",
            )),
        }
    }

    /// Express/tracking info, set when the order ships.
    pub fn set_tracking(
        &mut self,
        express_company: impl Into<String>,
        tracking_number: impl Into<String>,
    ) -> DomainResult<()> {
        match self.status {
            OrderStatus::Paid | OrderStatus::Shipping | OrderStatus::Returning => {
                self.express_company = Some(express_company.into());
                self.tracking_number = Some(tracking_number.into());
                Ok(())
            }
            _ => Err(DomainError::validation(
                "tracking info requires a shipping-adjacent status",
            )),
        }
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::CouponKind;

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

    fn items(prices: &[Cents]) -> Vec<OrderItem> {
        prices
            .iter()
            .map(|&price| OrderItem {
                product_id: ProductId::new(),
                price,
            })
            .collect()
    }

    fn order_with(prices: &[Cents], coupon: Option<&Coupon>) -> Order {
        Order::create(
            OrderId::new(),
            UserId::new(),
            items(prices),
            address(),
            coupon,
            "",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn totals_sum_item_strike_prices() {
        let order = order_with(&[1000, 2000], None);
        assert_eq!(order.total_price(), 3000);
        assert_eq!(order.discount_amount(), 0);
        assert_eq!(order.amount_to_pay(), 3000);
        assert_eq!(order.status(), OrderStatus::Unpaid);
    }

    #[test]
    fn coupon_applies_only_above_threshold() {
        let coupon = Coupon {
            code: "TEN".into(),
            kind: CouponKind::Rate { percent: 10 },
            price_required: 2000,
            is_valid: true,
        };
        let order = order_with(&[1000, 2000], Some(&coupon));
        assert_eq!(order.discount_amount(), 300);

        let below = order_with(&[1500], Some(&coupon));
        assert_eq!(below.discount_amount(), 0);
    }

    #[test]
    fn invalid_coupon_is_ignored() {
        let coupon = Coupon {
            code: "OLD".into(),
            kind: CouponKind::Amount { amount: 500 },
            price_required: 0,
            is_valid: false,
        };
        let order = order_with(&[3000], Some(&coupon));
        assert_eq!(order.discount_amount(), 0);
    }

    #[test]
    fn empty_order_is_rejected() {
        let err = Order::create(
            OrderId::new(),
            UserId::new(),
            Vec::new(),
            address(),
            None,
            "",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cancelling_an_unpaid_order_releases_products_without_refund() {
        let mut order = order_with(&[1000, 2000], None);
        let effects = order.transition(OrderStatus::Cancelled, Utc::now()).unwrap();
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], OrderEffect::ReleaseProducts(ref ids) if ids.len() == 2));
        assert_eq!(order.last_status(), Some(OrderStatus::Unpaid));
    }

    #[test]
    fn cancelling_a_paid_order_also_refunds_the_payment() {
        let mut order = order_with(&[3000], None);
        order.record_paid(3000, Utc::now()).unwrap();
        let effects = order.transition(OrderStatus::Cancelled, Utc::now()).unwrap();
        assert!(effects.contains(&OrderEffect::RefundLastSucceededPayment));
    }

    #[test]
    fn refund_still_fires_through_the_cancelling_detour() {
        let mut order = order_with(&[3000], None);
        order.record_paid(3000, Utc::now()).unwrap();
        order.transition(OrderStatus::Cancelling, Utc::now()).unwrap();
        let effects = order.transition(OrderStatus::Cancelled, Utc::now()).unwrap();
        assert!(effects.contains(&OrderEffect::RefundLastSucceededPayment));
    }

    #[test]
    fn done_awards_points_once() {
        let mut order = order_with(&[3000], None);
        order.record_paid(3000, Utc::now()).unwrap();
        order.transition(OrderStatus::Shipping, Utc::now()).unwrap();
        let effects = order.transition(OrderStatus::Done, Utc::now()).unwrap();
        assert_eq!(
            effects,
            vec![OrderEffect::AwardPoints { paid_amount: 3000 }]
        );

        // Return-requested and back: no second award.
        order
            .transition(OrderStatus::ReturnRequested, Utc::now())
            .unwrap();
        let effects = order.transition(OrderStatus::Done, Utc::now()).unwrap();
        assert!(effects.is_empty());
    }

    #[test]
    fn same_status_request_is_a_silent_no_op() {
        let mut order = order_with(&[1000], None);
        let effects = order.transition(OrderStatus::Unpaid, Utc::now()).unwrap();
        assert!(effects.is_empty());
        assert!(order.transition_log().is_empty());
    }

    #[test]
    fn terminal_statuses_reject_further_transitions() {
        let mut order = order_with(&[1000], None);
        order.transition(OrderStatus::Closed, Utc::now()).unwrap();
        let err = order.transition(OrderStatus::Paid, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::IllegalTransition { .. }));
    }

    #[test]
    fn transition_log_is_append_only_and_ordered() {
        let mut order = order_with(&[3000], None);
        order.record_paid(3000, Utc::now()).unwrap();
        order.transition(OrderStatus::Shipping, Utc::now()).unwrap();
        order.transition(OrderStatus::Done, Utc::now()).unwrap();

        let log = order.transition_log();
        assert_eq!(log.len(), 3);
        assert_eq!((log[0].from, log[0].to), (OrderStatus::Unpaid, OrderStatus::Paid));
        assert_eq!((log[2].from, log[2].to), (OrderStatus::Shipping, OrderStatus::Done));
    }

    #[test]
    fn comment_locks_after_shipping() {
        let mut order = order_with(&[3000], None);
        order.set_comment("gift wrap please").unwrap();
        order.record_paid(3000, Utc::now()).unwrap();
        order.set_comment("changed my mind").unwrap();
        order.transition(OrderStatus::Shipping, Utc::now()).unwrap();
        assert!(order.set_comment("too late").is_err());
        assert_eq!(order.comment(), "changed my mind");
    }
}
