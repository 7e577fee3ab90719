//! Sell request status lifecycle.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use recommerce_core::{StatusGraph, StatusLabel};

/// Sell request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellRequestStatus {
    Created,
    Cancelled,
    Denied,
    Valuated,
    Closed,
    Decided,
    Shipping,
    Authenticating,
    Selling,
    Done,
}

impl StatusLabel for SellRequestStatus {
    fn label(&self) -> &'static str {
        match self {
            SellRequestStatus::Created => "created",
            SellRequestStatus::Cancelled => "cancelled",
            SellRequestStatus::Denied => "denied",
            SellRequestStatus::Valuated => "valuated",
            SellRequestStatus::Closed => "closed",
            SellRequestStatus::Decided => "decided",
            SellRequestStatus::Shipping => "shipping",
            SellRequestStatus::Authenticating => "authenticating",
            SellRequestStatus::Selling => "selling",
            SellRequestStatus::Done => "done",
        }
    }
}

impl core::fmt::Display for SellRequestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

static GRAPH: LazyLock<StatusGraph<SellRequestStatus>> = LazyLock::new(|| {
    use SellRequestStatus::*;
    StatusGraph::new(
        "sell_request",
        Created,
        &[
            Created,
            Cancelled,
            Denied,
            Valuated,
            Closed,
            Decided,
            Shipping,
            Authenticating,
            Selling,
            Done,
        ],
        &[
            (Created, Cancelled),
            (Created, Denied),
            (Created, Valuated),
            (Valuated, Closed),
            (Valuated, Decided),
            (Decided, Shipping),
            (Shipping, Authenticating),
            (Authenticating, Selling),
            (Authenticating, Done),
            (Selling, Done),
        ],
    )
    .expect("sell request status graph is statically valid")
});

impl SellRequestStatus {
    /// The process-wide sell request transition graph.
    pub fn graph() -> &'static StatusGraph<SellRequestStatus> {
        &GRAPH
    }
}
