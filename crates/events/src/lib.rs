//! Domain events and the pub/sub plumbing used to fan them out.
//!
//! Stock transactions and distribution notifications are modelled as
//! [`Event`]s; interested collaborators (loggers, notifiers, exporters)
//! subscribe through an [`EventBus`].

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
