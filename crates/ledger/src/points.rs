//! Point/currency conversion policy.

use serde::{Deserialize, Serialize};

use recommerce_core::Cents;

/// Conversion rules between loyalty points and currency.
///
/// The two directions must be mutual inverses, so amounts spent from points
/// are first clamped down to a whole multiple of `cents_per_point`; then
/// `points_for(cents_value(p)) == p` holds exactly in integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsPolicy {
    /// Value of one point when spent, in cents.
    pub cents_per_point: u64,
    /// One point is earned per this many cents of paid order value.
    pub earn_divisor_cents: u64,
}

impl Default for PointsPolicy {
    fn default() -> Self {
        // 1 point = 1 cent; 1 point earned per 10 paid dollars.
        Self {
            cents_per_point: 1,
            earn_divisor_cents: 1000,
        }
    }
}

impl PointsPolicy {
    /// Currency value of a point holding.
    pub fn cents_value(&self, points: u64) -> Cents {
        points * self.cents_per_point
    }

    /// Points needed to cover `amount` cents (exact; `amount` must already be
    /// a multiple of `cents_per_point`, see [`spendable`](Self::spendable)).
    pub fn points_for(&self, amount: Cents) -> u64 {
        amount / self.cents_per_point
    }

    /// Largest point-covered amount not exceeding both `amount_to_pay` and
    /// the value of `points`, clamped to a whole number of points.
    pub fn spendable(&self, points: u64, amount_to_pay: Cents) -> Cents {
        let capped = amount_to_pay.min(self.cents_value(points));
        capped - capped % self.cents_per_point
    }

    /// Points awarded when an order completes with `paid_amount` cents.
    pub fn earned(&self, paid_amount: Cents) -> u64 {
        paid_amount / self.earn_divisor_cents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn spendable_is_capped_by_amount_and_holdings() {
        let policy = PointsPolicy::default();
        // 500 points are worth 500 cents; paying 300 cents uses 300 of them.
        assert_eq!(policy.spendable(500, 300), 300);
        assert_eq!(policy.points_for(300), 300);
        // Holdings smaller than the bill cap the spend.
        assert_eq!(policy.spendable(120, 300), 120);
    }

    #[test]
    fn earned_floors_paid_amount() {
        let policy = PointsPolicy::default();
        assert_eq!(policy.earned(2999), 2);
        assert_eq!(policy.earned(3000), 3);
        assert_eq!(policy.earned(999), 0);
    }

    proptest! {
        // The spent amount always converts back to a whole point count that
        // re-converts to the same amount.
        #[test]
        fn conversions_are_mutual_inverses(
            cents_per_point in 1u64..500,
            points in 0u64..100_000,
            amount in 0u64..10_000_000,
        ) {
            let policy = PointsPolicy { cents_per_point, earn_divisor_cents: 1000 };
            let spend = policy.spendable(points, amount);
            let used = policy.points_for(spend);
            prop_assert_eq!(policy.cents_value(used), spend);
            prop_assert!(used <= points);
            prop_assert!(spend <= amount);
        }
    }
}
