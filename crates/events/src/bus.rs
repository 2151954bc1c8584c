//! Publish/subscribe seam between the distribution core and its listeners.
//!
//! The core publishes notifications (per-institution cycle summaries, overdue
//! alerts) without knowing who listens. Delivery is best-effort: the core
//! never depends on a publish succeeding, it only logs the failure.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};

/// Receiving end handed out by [`EventBus::subscribe`].
///
/// Sees every message published after it was created, in publish order.
/// Meant to be read from one thread.
///
/// ```ignore
/// let notices = bus.subscribe();
/// system.run_cycle();
/// for event in notices.drain() {
///     deliver(event);
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Everything queued right now, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Message fan-out.
///
/// ```text
/// DistributionCoordinator ──publish──▶ EventBus ──▶ Subscription
///                                                  ├─ notification sinks
///                                                  └─ audit / export
/// ```
///
/// `publish` may be called from several threads at once.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        B::publish(self, message)
    }

    fn subscribe(&self) -> Subscription<M> {
        B::subscribe(self)
    }
}
