//! Notification events.
//!
//! The shop notifies an external collaborator (mail dispatch, admin feeds) on
//! every entity creation and status change. Delivery is best-effort pub/sub:
//! a failed or missing subscriber never affects the state transition that
//! produced the event.

pub mod bus;
pub mod event;
pub mod notification;

pub use bus::{BusError, Mailbox, NotificationBus};
pub use event::Event;
pub use notification::Notification;
