//! Inventory domain module: the central stock ledger.
//!
//! [`InventoryStore`] is the sole owner of available quantities. Everything
//! else refers to titles by [`bookdist_core::CatalogId`].

pub mod catalog;
pub mod store;
pub mod transaction;

pub use catalog::{CatalogEntry, Category};
pub use store::{InventoryStore, StockLevel};
pub use transaction::{StockTransaction, TransactionKind};
