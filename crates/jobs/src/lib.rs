//! Background execution for the shop.
//!
//! Two primitives:
//! - [`WorkerPool`]: a fixed pool of threads running submitted closures,
//!   used for fire-and-forget work such as notification delivery.
//! - [`DelayScheduler`]: a timer thread that runs closures after a delay,
//!   used for deferred jobs such as closing unpaid orders on timeout.
//!
//! Neither primitive retries. A deferred job must re-check entity state when
//! it finally runs; the entity may have moved on while the timer was armed.

pub mod pool;
pub mod scheduler;

pub use pool::WorkerPool;
pub use scheduler::DelayScheduler;

/// A unit of background work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;
