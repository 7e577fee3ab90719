//! Status transition graph.
//!
//! Every lifecycle entity (order, payment, sell request, withdrawal) declares
//! its statuses and the directed edges between them once, at startup. The
//! graph then answers two questions: is a requested transition legal, and
//! what can happen next from a given status (for UI-facing hints).

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A status enum usable in a [`StatusGraph`].
///
/// `label` returns the stable wire/name form of the status (e.g.
/// `"return-requested"`), used in errors and notifications.
pub trait StatusLabel:
    Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static
{
    fn label(&self) -> &'static str;
}

/// Immutable directed graph of allowed status transitions.
///
/// A transition `(src, dst)` is legal iff `src == dst` (no-op) or `(src, dst)`
/// is a declared edge. The graph is validated at construction and never
/// mutated afterwards.
#[derive(Debug)]
pub struct StatusGraph<S: StatusLabel> {
    entity: &'static str,
    statuses: HashSet<S>,
    edges: HashSet<(S, S)>,
}

impl<S: StatusLabel> StatusGraph<S> {
    /// Build a graph over `statuses` with the given edge list.
    ///
    /// Fails with [`DomainError::Configuration`] if an edge references a
    /// status outside the declared set, or if some declared status is not
    /// reachable from `initial`. Both are wiring bugs and must surface at
    /// startup, not at request time.
    pub fn new(
        entity: &'static str,
        initial: S,
        statuses: &[S],
        edges: &[(S, S)],
    ) -> DomainResult<Self> {
        let status_set: HashSet<S> = statuses.iter().copied().collect();

        if !status_set.contains(&initial) {
            return Err(DomainError::configuration(format!(
                "{entity}: initial status {:?} not in status set",
                initial
            )));
        }

        let mut edge_set = HashSet::with_capacity(edges.len());
        for &(src, dst) in edges {
            if !status_set.contains(&src) || !status_set.contains(&dst) {
                return Err(DomainError::configuration(format!(
                    "{entity}: edge {:?} -> {:?} references an unknown status",
                    src, dst
                )));
            }
            edge_set.insert((src, dst));
        }

        let graph = Self {
            entity,
            statuses: status_set,
            edges: edge_set,
        };
        graph.check_reachability(initial)?;
        Ok(graph)
    }

    fn check_reachability(&self, initial: S) -> DomainResult<()> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        seen.insert(initial);
        queue.push_back(initial);

        while let Some(status) = queue.pop_front() {
            for &(src, dst) in &self.edges {
                if src == status && seen.insert(dst) {
                    queue.push_back(dst);
                }
            }
        }

        let unreachable: Vec<&'static str> = self
            .statuses
            .iter()
            .filter(|s| !seen.contains(s))
            .map(|s| s.label())
            .collect();
        if unreachable.is_empty() {
            Ok(())
        } else {
            Err(DomainError::configuration(format!(
                "{}: statuses unreachable from {}: {}",
                self.entity,
                initial.label(),
                unreachable.join(", ")
            )))
        }
    }

    /// The entity name this graph belongs to (used in errors).
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Is the transition `src -> dst` legal?
    pub fn allowed(&self, src: S, dst: S) -> bool {
        self.statuses.contains(&src)
            && self.statuses.contains(&dst)
            && (src == dst || self.edges.contains(&(src, dst)))
    }

    /// Like [`allowed`](Self::allowed), but produces the rejection error.
    pub fn check(&self, src: S, dst: S) -> DomainResult<()> {
        if self.allowed(src, dst) {
            Ok(())
        } else {
            Err(DomainError::IllegalTransition {
                entity: self.entity,
                from: src.label(),
                to: dst.label(),
            })
        }
    }

    /// The status itself plus every status it can directly transition to.
    pub fn direct_successors(&self, status: S) -> HashSet<S> {
        if !self.statuses.contains(&status) {
            return HashSet::new();
        }
        let mut out: HashSet<S> = self
            .edges
            .iter()
            .filter(|(src, _)| *src == status)
            .map(|(_, dst)| *dst)
            .collect();
        out.insert(status);
        out
    }

    /// The status itself plus every status that can directly transition to it.
    pub fn direct_predecessors(&self, status: S) -> HashSet<S> {
        if !self.statuses.contains(&status) {
            return HashSet::new();
        }
        let mut out: HashSet<S> = self
            .edges
            .iter()
            .filter(|(_, dst)| *dst == status)
            .map(|(src, _)| *src)
            .collect();
        out.insert(status);
        out
    }

    /// A status with no outgoing edges is terminal.
    pub fn is_terminal(&self, status: S) -> bool {
        self.statuses.contains(&status) && !self.edges.iter().any(|(src, _)| *src == status)
    }
}

/// One entry in an entity's append-only transition log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange<S> {
    pub from: S,
    pub to: S,
    pub at: DateTime<Utc>,
}
