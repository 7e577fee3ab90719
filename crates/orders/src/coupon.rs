//! Coupons: rate or flat-amount discounts with a minimum-spend threshold.

use serde::{Deserialize, Serialize};

use recommerce_core::money::{Cents, percent_of};

/// How a coupon discounts the order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum CouponKind {
    /// Percentage off the total, rounded to a whole cent.
    Rate { percent: u32 },
    /// Fixed amount off the total.
    Amount { amount: Cents },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub kind: CouponKind,
    /// The coupon only applies when the order total exceeds this (strictly).
    pub price_required: Cents,
    pub is_valid: bool,
}

impl Coupon {
    /// Discount for the given total, zero when below the threshold.
    ///
    /// The result is clamped to the total so a flat coupon can never drive
    /// the amount to pay negative.
    pub fn discount_amount(&self, total_price: Cents) -> Cents {
        if total_price <= self.price_required {
            return 0;
        }
        let discount = match self.kind {
            CouponKind::Rate { percent } => percent_of(total_price, percent),
            CouponKind::Amount { amount } => amount,
        };
        discount.min(total_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rate_coupon() -> Coupon {
        Coupon {
            code: "TEN".into(),
            kind: CouponKind::Rate { percent: 10 },
            price_required: 2000,
            is_valid: true,
        }
    }

    #[test]
    fn rate_coupon_above_threshold_discounts_rounded_cents() {
        assert_eq!(rate_coupon().discount_amount(3000), 300);
    }

    #[test]
    fn coupon_below_threshold_discounts_nothing() {
        assert_eq!(rate_coupon().discount_amount(1500), 0);
        // Threshold is strict: exactly at price_required still no discount.
        assert_eq!(rate_coupon().discount_amount(2000), 0);
    }

    #[test]
    fn amount_coupon_is_flat_but_clamped_to_total() {
        let coupon = Coupon {
            code: "FIVE".into(),
            kind: CouponKind::Amount { amount: 500 },
            price_required: 0,
            is_valid: true,
        };
        assert_eq!(coupon.discount_amount(3000), 500);
        assert_eq!(coupon.discount_amount(300), 300);
    }

    proptest! {
        #[test]
        fn discount_never_exceeds_total(
            percent in 0u32..=100,
            threshold in 0u64..100_000,
            total in 0u64..1_000_000,
        ) {
            let coupon = Coupon {
                code: "P".into(),
                kind: CouponKind::Rate { percent },
                price_required: threshold,
                is_valid: true,
            };
            let discount = coupon.discount_amount(total);
            prop_assert!(discount <= total);
            if total <= threshold {
                prop_assert_eq!(discount, 0);
            }
        }
    }
}
