//! Observational record of requests that arrived while a title was short.
//!
//! Entries are never consumed by allocation; they only describe unmet demand.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use bookdist_core::{CatalogId, InstitutionId};
use bookdist_institutions::Priority;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingEntry {
    pub catalog_id: CatalogId,
    pub institution_id: InstitutionId,
    pub quantity: u32,
    pub priority: Priority,
    pub requested_at: DateTime<Utc>,
}

/// Per-title FIFO queues of [`WaitingEntry`].
#[derive(Debug, Default)]
pub struct WaitingListManager {
    queues: Mutex<BTreeMap<CatalogId, VecDeque<WaitingEntry>>>,
}

impl WaitingListManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn queues(&self) -> MutexGuard<'_, BTreeMap<CatalogId, VecDeque<WaitingEntry>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_entry(
        &self,
        catalog_id: CatalogId,
        institution_id: InstitutionId,
        quantity: u32,
        priority: Priority,
        requested_at: DateTime<Utc>,
    ) {
        debug!(%catalog_id, %institution_id, quantity, %priority, "added to waiting list");
        self.queues()
            .entry(catalog_id.clone())
            .or_default()
            .push_back(WaitingEntry {
                catalog_id,
                institution_id,
                quantity,
                priority,
                requested_at,
            });
    }

    pub fn has_waiting(&self, catalog_id: &CatalogId) -> bool {
        self.count(catalog_id) > 0
    }

    pub fn count(&self, catalog_id: &CatalogId) -> usize {
        self.queues().get(catalog_id).map_or(0, VecDeque::len)
    }

    /// Entries for one title, oldest first.
    pub fn entries(&self, catalog_id: &CatalogId) -> Vec<WaitingEntry> {
        self.queues()
            .get(catalog_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.queues().values().map(VecDeque::len).sum()
    }

    /// Entry count per title, titles in id order.
    pub fn summary(&self) -> BTreeMap<CatalogId, usize> {
        self.queues()
            .iter()
            .map(|(id, q)| (id.clone(), q.len()))
            .collect()
    }
}
