use chrono::{DateTime, Utc};

/// A fact that something happened: a stock movement, a cycle, an overdue loan.
///
/// Values are immutable once built and are cloned to every subscriber.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, e.g. `"inventory.stock.allocated"`.
    fn event_type(&self) -> &'static str;

    /// Payload schema version, bumped on incompatible changes.
    fn version(&self) -> u32;

    /// Business time of the fact, not publish time.
    fn occurred_at(&self) -> DateTime<Utc>;
}
