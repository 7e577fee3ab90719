//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; they
/// have no identity of their own. Address snapshots are the canonical example
/// here: once copied onto an order or payment they never change, regardless
/// of what happens to the source record.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
