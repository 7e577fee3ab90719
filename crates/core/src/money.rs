//! Money primitives.

/// Monetary amount in the smallest currency unit (cents).
///
/// All prices, balances and discounts are integer cents; "rounded to two
/// decimal places" in business rules means rounded to a whole cent.
pub type Cents = u64;

/// Round-half-up percentage of an amount, in cents.
///
/// Used for rate coupons: `percent_of(3000, 10) == 300`.
pub fn percent_of(amount: Cents, percent: u32) -> Cents {
    (amount * percent as u64 + 50) / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_rounds_half_up_to_whole_cents() {
        assert_eq!(percent_of(3000, 10), 300);
        assert_eq!(percent_of(999, 10), 100); // 99.9 -> 100
        assert_eq!(percent_of(994, 10), 99); // 99.4 -> 99
        assert_eq!(percent_of(0, 50), 0);
    }
}
