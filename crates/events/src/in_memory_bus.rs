//! In-process broadcast bus backed by `std::sync::mpsc` channels.

use std::sync::{Mutex, MutexGuard, PoisonError, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InMemoryBusError {
    /// The bus was closed; nothing more is delivered.
    #[error("event bus closed")]
    Closed,
}

#[derive(Debug)]
struct Fanout<M> {
    senders: Vec<mpsc::Sender<M>>,
    closed: bool,
}

/// Broadcast bus for a single process.
///
/// Every live subscription receives a clone of each message. Subscriptions
/// whose receiver was dropped are forgotten on the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    fanout: Mutex<Fanout<M>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    fn fanout(&self) -> MutexGuard<'_, Fanout<M>> {
        self.fanout.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live subscriptions as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.fanout().senders.len()
    }

    /// Disconnect all subscribers and refuse further publishes.
    pub fn close(&self) {
        let mut fanout = self.fanout();
        fanout.closed = true;
        fanout.senders.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.fanout().closed
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            fanout: Mutex::new(Fanout {
                senders: Vec::new(),
                closed: false,
            }),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut fanout = self.fanout();
        if fanout.closed {
            return Err(InMemoryBusError::Closed);
        }
        fanout.senders.retain(|tx| tx.send(message.clone()).is_ok());
        Ok(())
    }

    /// On a closed bus the subscription is already disconnected.
    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        let mut fanout = self.fanout();
        if !fanout.closed {
            fanout.senders.push(tx);
        }
        Subscription::new(rx)
    }
}
