//! Shop configuration.

use std::time::Duration;

use recommerce_ledger::PointsPolicy;

/// Tunables for the shop service.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// How long an order may stay unpaid before it is force-closed.
    pub order_timeout: Duration,
    /// How long a payment may stay pending before it is force-closed.
    pub payment_timeout: Duration,
    /// Point/currency conversion rules.
    pub points: PointsPolicy,
    /// Worker threads for fire-and-forget work (notifications, timeouts).
    pub workers: usize,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            order_timeout: Duration::from_secs(30 * 60),
            payment_timeout: Duration::from_secs(5 * 60),
            points: PointsPolicy::default(),
            workers: 4,
        }
    }
}

impl ShopConfig {
    pub fn with_order_timeout(mut self, timeout: Duration) -> Self {
        self.order_timeout = timeout;
        self
    }

    pub fn with_payment_timeout(mut self, timeout: Duration) -> Self {
        self.payment_timeout = timeout;
        self
    }

    pub fn with_points(mut self, points: PointsPolicy) -> Self {
        self.points = points;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}
