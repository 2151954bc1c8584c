//! Thread-safe stock ledger keyed by catalog id.
//!
//! Locking layout:
//! - `slots` (RwLock) maps ids to per-title slots; it is only held long enough
//!   to clone the slot's `Arc`.
//! - each slot guards its own quantity with a `Mutex`, so check-then-decrement
//!   on one title is a single critical section while different titles proceed
//!   in parallel.
//! - the transaction log is appended while the slot lock is held, keeping the
//!   log order consistent with the per-title mutation order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bookdist_core::validation::ensure_quantity;
use bookdist_core::{CatalogId, DomainError, DomainResult};

use crate::catalog::{CatalogEntry, Category};
use crate::transaction::{StockTransaction, TransactionKind};

/// Point-in-time view of one title and its available quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub entry: CatalogEntry,
    pub available: u32,
}

#[derive(Debug)]
struct StockSlot {
    entry: CatalogEntry,
    available: Mutex<u32>,
}

impl StockSlot {
    fn level(&self) -> StockLevel {
        StockLevel {
            entry: self.entry.clone(),
            available: *lock(&self.available),
        }
    }
}

/// Central inventory.
#[derive(Debug, Default)]
pub struct InventoryStore {
    slots: RwLock<HashMap<CatalogId, Arc<StockSlot>>>,
    category_index: RwLock<BTreeMap<Category, BTreeSet<CatalogId>>>,
    transactions: Mutex<Vec<StockTransaction>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn slot(&self, id: &CatalogId) -> Option<Arc<StockSlot>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(id).cloned()
    }

    fn slot_or_not_found(&self, id: &CatalogId) -> DomainResult<Arc<StockSlot>> {
        self.slot(id)
            .ok_or_else(|| DomainError::not_found(format!("catalog entry {id}")))
    }

    fn record(&self, kind: TransactionKind, catalog_id: &CatalogId, quantity: u32) {
        lock(&self.transactions).push(StockTransaction {
            kind,
            catalog_id: catalog_id.clone(),
            quantity,
            occurred_at: Utc::now(),
        });
    }

    /// Add `qty` copies of `entry`.
    ///
    /// First sight of an id creates the slot and indexes its category; later
    /// calls merge the quantity and keep the identity registered first.
    pub fn add_stock(&self, entry: CatalogEntry, qty: u32) -> DomainResult<u32> {
        ensure_quantity(qty)?;
        let id = entry.catalog_id().clone();

        let slot = match self.slot(&id) {
            Some(slot) => slot,
            None => {
                let category = entry.category();
                let (slot, inserted) = {
                    let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
                    let inserted = !slots.contains_key(&id);
                    let slot = slots
                        .entry(id.clone())
                        .or_insert_with(|| {
                            Arc::new(StockSlot {
                                entry,
                                available: Mutex::new(0),
                            })
                        })
                        .clone();
                    (slot, inserted)
                };
                if inserted {
                    self.category_index
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .entry(category)
                        .or_default()
                        .insert(id.clone());
                }
                slot
            }
        };

        let mut available = lock(&slot.available);
        let updated = available
            .checked_add(qty)
            .ok_or_else(|| DomainError::invariant(format!("stock overflow for {id}")))?;
        *available = updated;
        self.record(TransactionKind::Add, &id, qty);
        drop(available);

        info!(catalog_id = %id, quantity = qty, available = updated, "stock added");
        Ok(updated)
    }

    /// Atomically take `qty` units of `id`.
    ///
    /// `InsufficientStock` is the routine "no" answer and leaves the ledger
    /// untouched.
    pub fn allocate(&self, id: &CatalogId, qty: u32) -> DomainResult<u32> {
        ensure_quantity(qty)?;
        let slot = self.slot_or_not_found(id)?;

        let mut available = lock(&slot.available);
        if *available < qty {
            debug!(catalog_id = %id, requested = qty, available = *available, "allocation refused");
            return Err(DomainError::insufficient_stock(id.clone(), qty, *available));
        }
        *available -= qty;
        let remaining = *available;
        self.record(TransactionKind::Allocate, id, qty);
        drop(available);

        info!(catalog_id = %id, quantity = qty, available = remaining, "stock allocated");
        Ok(remaining)
    }

    /// Credit `qty` units back to `id`.
    ///
    /// No ceiling is enforced here; the loan tracker guarantees each loan is
    /// credited at most once.
    pub fn return_stock(&self, id: &CatalogId, qty: u32) -> DomainResult<u32> {
        if qty == 0 {
            return Err(DomainError::invalid_input("return quantity must be positive"));
        }
        let slot = self.slot_or_not_found(id)?;

        let mut available = lock(&slot.available);
        let updated = available
            .checked_add(qty)
            .ok_or_else(|| DomainError::invariant(format!("stock overflow for {id}")))?;
        *available = updated;
        self.record(TransactionKind::Return, id, qty);
        drop(available);

        info!(catalog_id = %id, quantity = qty, available = updated, "stock returned");
        Ok(updated)
    }

    /// Units currently available; 0 for unknown ids.
    pub fn available(&self, id: &CatalogId) -> u32 {
        self.slot(id).map(|s| *lock(&s.available)).unwrap_or(0)
    }

    pub fn contains(&self, id: &CatalogId) -> bool {
        self.slot(id).is_some()
    }

    pub fn entry(&self, id: &CatalogId) -> Option<CatalogEntry> {
        self.slot(id).map(|s| s.entry.clone())
    }

    pub fn stock_level(&self, id: &CatalogId) -> Option<StockLevel> {
        self.slot(id).map(|s| s.level())
    }

    /// All titles in a category, ordered by catalog id.
    pub fn by_category(&self, category: Category) -> Vec<StockLevel> {
        let ids: Vec<CatalogId> = {
            let index = self.category_index.read().unwrap_or_else(PoisonError::into_inner);
            index
                .get(&category)
                .map(|ids| ids.iter().cloned().collect())
                .unwrap_or_default()
        };
        ids.iter().filter_map(|id| self.stock_level(id)).collect()
    }

    /// Sum of available units across all titles.
    pub fn total_units(&self) -> u64 {
        self.slots_sorted()
            .iter()
            .map(|s| u64::from(*lock(&s.available)))
            .sum()
    }

    /// Number of distinct titles ever stocked.
    pub fn title_count(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Every title, ordered by catalog id.
    pub fn list(&self) -> Vec<StockLevel> {
        self.slots_sorted().iter().map(|s| s.level()).collect()
    }

    /// Case-insensitive substring match on the title.
    pub fn search_by_title(&self, keyword: &str) -> Vec<StockLevel> {
        let needle = keyword.to_lowercase();
        self.filter(|entry| entry.title().to_lowercase().contains(&needle))
    }

    /// Case-insensitive substring match on the author.
    pub fn search_by_author(&self, keyword: &str) -> Vec<StockLevel> {
        let needle = keyword.to_lowercase();
        self.filter(|entry| entry.author().to_lowercase().contains(&needle))
    }

    /// Full ledger in append order.
    pub fn transactions(&self) -> Vec<StockTransaction> {
        lock(&self.transactions).clone()
    }

    /// The `limit` most recent transactions, newest first.
    pub fn recent_transactions(&self, limit: usize) -> Vec<StockTransaction> {
        lock(&self.transactions)
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    fn filter(&self, pred: impl Fn(&CatalogEntry) -> bool) -> Vec<StockLevel> {
        self.slots_sorted()
            .iter()
            .filter(|s| pred(&s.entry))
            .map(|s| s.level())
            .collect()
    }

    fn slots_sorted(&self) -> Vec<Arc<StockSlot>> {
        let mut slots: Vec<Arc<StockSlot>> = {
            let map = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            map.values().cloned().collect()
        };
        slots.sort_by(|a, b| a.entry.catalog_id().cmp(b.entry.catalog_id()));
        slots
    }
}
