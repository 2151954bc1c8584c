//! Distribution layer: allocation strategies, the cycle coordinator, loans
//! and the waiting list, plus the [`BooksDistributionSystem`] facade that
//! wires them together for drivers.
//!
//! Locking discipline: the coordinator's cycle lock is always taken first and
//! only ever around calls into components that guard their own state
//! (inventory slots, institutions, registry, loan tracker). No component
//! calls back into the coordinator, and no two owner locks are held at once.

pub mod config;
pub mod coordinator;
pub mod loans;
pub mod notification;
pub mod snapshot;
pub mod strategy;
pub mod system;
pub mod waiting_list;

pub use config::SystemConfig;
pub use coordinator::{CycleReport, DistributionCoordinator};
pub use loans::{Loan, LoanTracker};
pub use notification::{CycleCompleted, DistributionEvent, InstitutionNotice, OverdueDetected};
pub use snapshot::{DistributionSummary, InstitutionRow, InventoryRow, SystemSnapshot};
pub use strategy::{AllocationStrategy, Allocation, DemandItem, DemandSnapshot};
pub use system::{BooksDistributionSystem, SearchQuery};
pub use waiting_list::{WaitingEntry, WaitingListManager};
