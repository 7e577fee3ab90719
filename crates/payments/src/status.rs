//! Payment status lifecycle.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use recommerce_core::{StatusGraph, StatusLabel};

/// Payment status. Everything except `pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Closed,
    Failed,
    Succeeded,
}

impl StatusLabel for PaymentStatus {
    fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Closed => "closed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Succeeded => "succeeded",
        }
    }
}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

static GRAPH: LazyLock<StatusGraph<PaymentStatus>> = LazyLock::new(|| {
    use PaymentStatus::*;
    StatusGraph::new(
        "payment",
        Pending,
        &[Pending, Closed, Failed, Succeeded],
        &[(Pending, Closed), (Pending, Failed), (Pending, Succeeded)],
    )
    .expect("payment status graph is statically valid")
});

impl PaymentStatus {
    /// The process-wide payment transition graph.
    pub fn graph() -> &'static StatusGraph<PaymentStatus> {
        &GRAPH
    }

    pub fn is_terminal(self) -> bool {
        Self::graph().is_terminal(self)
    }
}

#[cfg(test)]
mod tests {
    use super::PaymentStatus::*;
    use super::*;

    #[test]
    fn pending_fans_out_to_all_terminals() {
        let g = PaymentStatus::graph();
        assert!(g.allowed(Pending, Succeeded));
        assert!(g.allowed(Pending, Failed));
        assert!(g.allowed(Pending, Closed));
        assert!(!g.allowed(Failed, Succeeded));
        assert!(!g.allowed(Succeeded, Closed));
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!Pending.is_terminal());
        assert!(Closed.is_terminal());
        assert!(Failed.is_terminal());
        assert!(Succeeded.is_terminal());
    }
}
