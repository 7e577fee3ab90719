//! Payment entity, reservation planning, and transition side effects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use recommerce_core::{
    Address, Cents, DomainError, DomainResult, Entity, OrderId, PaymentId, UserId,
};
use recommerce_ledger::PointsPolicy;

use crate::provider::PaymentMethod;
use crate::status::PaymentStatus;

/// How much of a bill the ledger covers, split between points and balance.
///
/// Computed before the payment exists, debited atomically with its creation
/// (pessimistic reservation against concurrent attempts for the same user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReservePlan {
    pub amount_from_point: Cents,
    pub point_used: u64,
    pub amount_from_balance: Cents,
    /// What is left for an external provider.
    pub remainder: Cents,
}

/// Split `amount_to_pay` across points, balance, and an external remainder.
///
/// Points are consumed first (clamped to a whole point count so the inverse
/// conversion is exact), then balance; whatever is left is the provider's
/// problem.
pub fn plan_reservation(
    policy: &PointsPolicy,
    amount_to_pay: Cents,
    use_point: bool,
    points_available: u64,
    use_balance: bool,
    balance_available: Cents,
) -> ReservePlan {
    let mut plan = ReservePlan::default();
    let mut remaining = amount_to_pay;

    if use_point {
        plan.amount_from_point = policy.spendable(points_available, remaining);
        plan.point_used = policy.points_for(plan.amount_from_point);
        remaining -= plan.amount_from_point;
    }
    if use_balance && remaining > 0 {
        plan.amount_from_balance = remaining.min(balance_available);
        remaining -= plan.amount_from_balance;
    }
    plan.remainder = remaining;
    plan
}

/// Side effects of a payment status change, executed by the orchestration
/// layer inside the same transaction boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEffect {
    /// Payment succeeded: the owning order becomes paid with this amount.
    MarkOrderPaid { order_id: OrderId, amount: Cents },
    /// A standalone recharge succeeded: credit the user's balance.
    CreditRecharge { amount: Cents },
    /// Payment closed or failed: return the reserved portions to the ledger.
    RefundReservation { points: u64, balance: Cents },
}

/// One attempt to settle an order, or a standalone balance recharge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    user_id: UserId,
    order_id: Option<OrderId>,
    amount: Cents,
    use_balance: bool,
    use_point: bool,
    amount_from_balance: Cents,
    amount_from_point: Cents,
    point_used: u64,
    method: PaymentMethod,
    vendor_payment_id: Option<String>,
    /// Opaque provider payload, kept verbatim for audit.
    extra_info: Value,
    status: PaymentStatus,
    billing_address: Address,
    created_at: DateTime<Utc>,
}

impl Payment {
    /// Build a pending payment carrying an already-planned reservation.
    ///
    /// The caller debits the ledger by the plan's portions atomically with
    /// persisting this object.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: PaymentId,
        user_id: UserId,
        order_id: Option<OrderId>,
        amount: Cents,
        use_balance: bool,
        use_point: bool,
        plan: ReservePlan,
        method: PaymentMethod,
        billing_address: Address,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if plan.amount_from_balance + plan.amount_from_point > amount {
            return Err(DomainError::validation(
                "reserved portions exceed the payment amount",
            ));
        }
        billing_address.validate()?;

        Ok(Self {
            id,
            user_id,
            order_id,
            amount,
            use_balance,
            use_point,
            amount_from_balance: plan.amount_from_balance,
            amount_from_point: plan.amount_from_point,
            point_used: plan.point_used,
            method,
            vendor_payment_id: None,
            extra_info: Value::Null,
            status: PaymentStatus::Pending,
            billing_address,
            created_at: now,
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn amount(&self) -> Cents {
        self.amount
    }

    pub fn amount_from_balance(&self) -> Cents {
        self.amount_from_balance
    }

    pub fn amount_from_point(&self) -> Cents {
        self.amount_from_point
    }

    pub fn point_used(&self) -> u64 {
        self.point_used
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn vendor_payment_id(&self) -> Option<&str> {
        self.vendor_payment_id.as_deref()
    }

    pub fn extra_info(&self) -> &Value {
        &self.extra_info
    }

    pub fn billing_address(&self) -> &Address {
        &self.billing_address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The portion of the amount that was not covered by points. On refund
    /// of a succeeded payment this goes back to the balance.
    pub fn non_point_amount(&self) -> Cents {
        self.amount - self.amount_from_point
    }

    /// Record what the provider said about this payment.
    pub fn record_vendor_result(&mut self, vendor_payment_id: String, raw_response: Value) {
        self.vendor_payment_id = Some(vendor_payment_id);
        self.extra_info = raw_response;
    }

    /// Request a status change.
    ///
    /// Terminal-to-terminal and any other undeclared edge is rejected; a
    /// same-status request is a legal no-op with no effects, which is what
    /// makes a duplicate close/fail unable to double-refund.
    pub fn transition(&mut self, dst: PaymentStatus) -> DomainResult<Vec<PaymentEffect>> {
        PaymentStatus::graph().check(self.status, dst)?;
        if self.status == dst {
            return Ok(Vec::new());
        }
        self.status = dst;

        let mut effects = Vec::new();
        match dst {
            PaymentStatus::Succeeded => match self.order_id {
                Some(order_id) => effects.push(PaymentEffect::MarkOrderPaid {
                    order_id,
                    amount: self.amount,
                }),
                None => effects.push(PaymentEffect::CreditRecharge {
                    amount: self.amount,
                }),
            },
            PaymentStatus::Closed | PaymentStatus::Failed => {
                if self.point_used > 0 || self.amount_from_balance > 0 {
                    effects.push(PaymentEffect::RefundReservation {
                        points: self.point_used,
                        balance: self.amount_from_balance,
                    });
                    // Zero the reserved portions so a replayed refund has
                    // nothing left to return.
                    self.point_used = 0;
                    self.amount_from_point = 0;
                    self.amount_from_balance = 0;
                }
            }
            PaymentStatus::Pending => {}
        }
        Ok(effects)
    }
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

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

    fn payment_with(plan: ReservePlan, amount: Cents, order: Option<OrderId>) -> Payment {
        Payment::create(
            PaymentId::new(),
            UserId::new(),
            order,
            amount,
            true,
            true,
            plan,
            PaymentMethod::Card,
            address(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn plan_spends_points_then_balance() {
        let policy = PointsPolicy::default();
        // 500 points are worth 500 cents; bill of 300 cents is fully covered.
        let plan = plan_reservation(&policy, 300, true, 500, true, 10_000);
        assert_eq!(plan.amount_from_point, 300);
        assert_eq!(plan.point_used, 300);
        assert_eq!(plan.amount_from_balance, 0);
        assert_eq!(plan.remainder, 0);
    }

    #[test]
    fn plan_leaves_a_remainder_for_the_provider() {
        let policy = PointsPolicy::default();
        let plan = plan_reservation(&policy, 5000, true, 500, true, 1500);
        assert_eq!(plan.amount_from_point, 500);
        assert_eq!(plan.amount_from_balance, 1500);
        assert_eq!(plan.remainder, 3000);
    }

    #[test]
    fn plan_ignores_unused_sources() {
        let policy = PointsPolicy::default();
        let plan = plan_reservation(&policy, 5000, false, 500, false, 1500);
        assert_eq!(plan, ReservePlan { remainder: 5000, ..Default::default() });
    }

    #[test]
    fn create_rejects_overreserved_plans() {
        let plan = ReservePlan {
            amount_from_point: 200,
            point_used: 200,
            amount_from_balance: 200,
            remainder: 0,
        };
        let err = Payment::create(
            PaymentId::new(),
            UserId::new(),
            None,
            300,
            true,
            true,
            plan,
            PaymentMethod::Balance,
            address(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn succeeded_order_payment_marks_the_order_paid() {
        let order_id = OrderId::new();
        let mut payment = payment_with(ReservePlan::default(), 3000, Some(order_id));
        let effects = payment.transition(PaymentStatus::Succeeded).unwrap();
        assert_eq!(
            effects,
            vec![PaymentEffect::MarkOrderPaid {
                order_id,
                amount: 3000
            }]
        );
    }

    #[test]
    fn succeeded_recharge_credits_the_balance() {
        let mut payment = payment_with(ReservePlan::default(), 2500, None);
        let effects = payment.transition(PaymentStatus::Succeeded).unwrap();
        assert_eq!(effects, vec![PaymentEffect::CreditRecharge { amount: 2500 }]);
    }

    #[test]
    fn closing_refunds_the_reservation_exactly_once() {
        let plan = ReservePlan {
            amount_from_point: 300,
            point_used: 300,
            amount_from_balance: 700,
            remainder: 2000,
        };
        let mut payment = payment_with(plan, 3000, Some(OrderId::new()));

        let effects = payment.transition(PaymentStatus::Closed).unwrap();
        assert_eq!(
            effects,
            vec![PaymentEffect::RefundReservation {
                points: 300,
                balance: 700
            }]
        );

        // A duplicate close is a no-op: fields were zeroed on the first pass.
        let effects = payment.transition(PaymentStatus::Closed).unwrap();
        assert!(effects.is_empty());
        assert_eq!(payment.point_used(), 0);
        assert_eq!(payment.amount_from_balance(), 0);
    }

    #[test]
    fn terminal_statuses_reject_further_transitions() {
        let mut payment = payment_with(ReservePlan::default(), 100, None);
        payment.transition(PaymentStatus::Failed).unwrap();
        assert!(matches!(
            payment.transition(PaymentStatus::Succeeded),
            Err(DomainError::IllegalTransition { .. })
        ));
    }

    proptest! {
        // The reservation invariant from the data model: points + balance
        // portions never exceed the amount, and the remainder accounts for
        // the rest exactly.
        #[test]
        fn plan_partitions_the_amount(
            amount in 0u64..1_000_000,
            points in 0u64..50_000,
            balance in 0u64..1_000_000,
            use_point in any::<bool>(),
            use_balance in any::<bool>(),
        ) {
            let policy = PointsPolicy::default();
            let plan = plan_reservation(&policy, amount, use_point, points, use_balance, balance);
            prop_assert!(plan.amount_from_point + plan.amount_from_balance <= amount);
            prop_assert_eq!(
                plan.amount_from_point + plan.amount_from_balance + plan.remainder,
                amount
            );
            prop_assert!(plan.point_used <= points);
        }
    }
}
