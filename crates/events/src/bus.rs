//! Best-effort notification fan-out.

use std::sync::{Mutex, mpsc};
use std::time::Duration;

use recommerce_core::UserId;

use crate::notification::Notification;

#[derive(Debug)]
pub enum BusError {
    /// Publish failed due to internal lock poisoning.
    Poisoned,
}

/// A subscriber's receiving end.
///
/// Designed for single-threaded consumption; hand the mailbox to one worker
/// and poll it with [`recv_timeout`](Self::recv_timeout) so shutdown checks
/// can interleave.
#[derive(Debug)]
pub struct Mailbox {
    receiver: mpsc::Receiver<Notification>,
}

impl Mailbox {
    /// Block until the next notification is available.
    pub fn recv(&self) -> Result<Notification, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a notification without blocking.
    pub fn try_recv(&self) -> Result<Notification, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a notification.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Notification, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Everything,
    User(UserId),
}

impl Route {
    fn wants(self, notification: &Notification) -> bool {
        match self {
            Route::Everything => true,
            Route::User(user_id) => notification.user_id() == user_id,
        }
    }
}

#[derive(Debug)]
struct Outbox {
    route: Route,
    sender: mpsc::Sender<Notification>,
}

/// Routes notifications to subscribed mailboxes.
///
/// A mailbox sees either the whole stream (staff feeds, audit) or a single
/// user's notifications (per-user mail dispatch). Delivery is in-process and
/// best-effort: a publish failure never affects the state change that
/// produced the notification, and a dropped mailbox is pruned on the next
/// publish.
#[derive(Debug, Default)]
pub struct NotificationBus {
    outboxes: Mutex<Vec<Outbox>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every notification.
    pub fn subscribe(&self) -> Mailbox {
        self.attach(Route::Everything)
    }

    /// Subscribe to one user's notifications only.
    pub fn subscribe_user(&self, user_id: UserId) -> Mailbox {
        self.attach(Route::User(user_id))
    }

    fn attach(&self, route: Route) -> Mailbox {
        let (sender, receiver) = mpsc::channel();

        // If the lock is poisoned the mailbox is still handed out;
        // it just never receives anything.
        if let Ok(mut outboxes) = self.outboxes.lock() {
            outboxes.push(Outbox { route, sender });
        }

        Mailbox { receiver }
    }

    /// Deliver to every mailbox whose route matches the addressee.
    pub fn publish(&self, notification: &Notification) -> Result<(), BusError> {
        let mut outboxes = self.outboxes.lock().map_err(|_| BusError::Poisoned)?;

        outboxes.retain(|outbox| {
            if !outbox.route.wants(notification) {
                return true;
            }
            outbox.sender.send(notification.clone()).is_ok()
        });

        Ok(())
    }
}
