//! Order status lifecycle.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use recommerce_core::{StatusGraph, StatusLabel};

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Unpaid,
    Paid,
    Cancelling,
    Cancelled,
    Closed,
    Shipping,
    Done,
    ReturnRequested,
    Returning,
    Returned,
}

impl StatusLabel for OrderStatus {
    fn label(&self) -> &'static str {
        match self {
            OrderStatus::Unpaid => "unpaid",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelling => "cancelling",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Closed => "closed",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Done => "done",
            OrderStatus::ReturnRequested => "return-requested",
            OrderStatus::Returning => "returning",
            OrderStatus::Returned => "returned",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

static GRAPH: LazyLock<StatusGraph<OrderStatus>> = LazyLock::new(|| {
    use OrderStatus::*;
    StatusGraph::new(
        "order",
        Unpaid,
        &[
            Unpaid,
            Paid,
            Cancelling,
            Cancelled,
            Closed,
            Shipping,
            Done,
            ReturnRequested,
            Returning,
            Returned,
        ],
        &[
            (Unpaid, Paid),
            (Unpaid, Cancelled),
            (Unpaid, Closed),
            (Paid, Cancelling),
            (Paid, Cancelled),
            (Paid, Shipping),
            (Cancelling, Cancelled),
            (Shipping, Done),
            (Done, ReturnRequested),
            (ReturnRequested, Done),
            (ReturnRequested, Returning),
            (Returning, Returned),
        ],
    )
    .expect("order status graph is statically valid")
});

impl OrderStatus {
    /// The process-wide order transition graph.
    pub fn graph() -> &'static StatusGraph<OrderStatus> {
        &GRAPH
    }
}
