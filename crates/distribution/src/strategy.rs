//! Allocation strategies.
//!
//! A strategy consumes a [`DemandSnapshot`] (pending demand captured at the
//! start of a cycle) and the live [`InventoryStore`]. For each pair it
//! decides a quantity, takes it from the store, credits the institution and
//! advances the request. Running out of stock is never an error; the pair is
//! simply skipped.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use bookdist_core::{CatalogId, DomainError, InstitutionId, RequestId};
use bookdist_institutions::{Institution, Priority, RequestStatus};
use bookdist_inventory::InventoryStore;

/// The closed set of allocation policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// Highest priority first; equal priorities in submission order.
    #[default]
    PriorityBased,
    /// Each request gets `floor(A * need / total_need)` of the title.
    NeedProportional,
    /// Each institution with outstanding need gets `floor(A / k)`.
    Equal,
}

impl AllocationStrategy {
    pub fn name(self) -> &'static str {
        match self {
            AllocationStrategy::PriorityBased => "Priority-Based Distribution",
            AllocationStrategy::NeedProportional => "Need-Based Proportional Distribution",
            AllocationStrategy::Equal => "Equal Distribution",
        }
    }

    /// Run this policy once over `demand`.
    pub fn distribute(self, store: &InventoryStore, demand: &DemandSnapshot) -> Vec<Allocation> {
        match self {
            AllocationStrategy::PriorityBased => distribute_by_priority(store, demand),
            AllocationStrategy::NeedProportional => distribute_proportionally(store, demand),
            AllocationStrategy::Equal => distribute_equally(store, demand),
        }
    }
}

impl core::fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AllocationStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priority" | "priority_based" | "priority-based" => Ok(AllocationStrategy::PriorityBased),
            "proportional" | "need" | "need_proportional" | "need-proportional" => {
                Ok(AllocationStrategy::NeedProportional)
            }
            "equal" => Ok(AllocationStrategy::Equal),
            other => Err(DomainError::invalid_input(format!(
                "unknown allocation strategy '{other}'"
            ))),
        }
    }
}

/// One open request as seen at snapshot time.
#[derive(Debug, Clone)]
pub struct DemandItem {
    pub institution: Arc<Institution>,
    pub request_id: RequestId,
    pub catalog_id: CatalogId,
    pub remaining: u32,
    pub priority: Priority,
    pub sequence: u64,
}

impl DemandItem {
    pub fn institution_id(&self) -> &InstitutionId {
        self.institution.id_typed()
    }
}

/// Point-in-time view of all open demand.
///
/// Requests submitted after capture are not part of it.
#[derive(Debug, Clone)]
pub struct DemandSnapshot {
    items: Vec<DemandItem>,
    taken_at: DateTime<Utc>,
}

impl DemandSnapshot {
    /// Collect open requests with remaining need from each institution in
    /// turn (institution locks are taken one at a time).
    pub fn capture(institutions: &[Arc<Institution>], taken_at: DateTime<Utc>) -> Self {
        let items = institutions
            .iter()
            .flat_map(|inst| {
                inst.pending()
                    .into_iter()
                    .filter(|r| r.remaining() > 0)
                    .map(|r| DemandItem {
                        institution: Arc::clone(inst),
                        request_id: r.id_typed(),
                        catalog_id: r.catalog_id().clone(),
                        remaining: r.remaining(),
                        priority: r.priority(),
                        sequence: r.sequence(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { items, taken_at }
    }

    pub fn items(&self) -> &[DemandItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Items grouped by title, titles in id order, items in submission order.
    fn by_catalog(&self) -> BTreeMap<&CatalogId, Vec<&DemandItem>> {
        let mut groups: BTreeMap<&CatalogId, Vec<&DemandItem>> = BTreeMap::new();
        for item in &self.items {
            groups.entry(&item.catalog_id).or_default().push(item);
        }
        for items in groups.values_mut() {
            items.sort_by_key(|i| i.sequence);
        }
        groups
    }
}

/// A successful grant of stock to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub institution_id: InstitutionId,
    pub request_id: RequestId,
    pub catalog_id: CatalogId,
    pub quantity: u32,
    /// Request status right after this grant.
    pub status: RequestStatus,
}

/// Take `qty` from the store and book it against `item`.
///
/// Returns `None` when the store refuses. If the request can no longer take
/// stock (closed since the snapshot), the units go straight back to the store.
fn grant(store: &InventoryStore, item: &DemandItem, qty: u32) -> Option<Allocation> {
    if qty == 0 {
        return None;
    }

    if let Err(e) = store.allocate(&item.catalog_id, qty) {
        if e.is_insufficient_stock() {
            debug!(catalog_id = %item.catalog_id, request_id = %item.request_id, quantity = qty, "stock exhausted for request");
        } else {
            warn!(catalog_id = %item.catalog_id, request_id = %item.request_id, error = %e, "allocation failed");
        }
        return None;
    }

    let status = match item.institution.fulfill_partial(item.request_id, qty) {
        Ok(status) => status,
        Err(e) => {
            warn!(request_id = %item.request_id, error = %e, "request closed since snapshot; releasing stock");
            if let Err(e) = store.return_stock(&item.catalog_id, qty) {
                warn!(catalog_id = %item.catalog_id, error = %e, "failed to release stock");
            }
            return None;
        }
    };
    item.institution.receive_books(&item.catalog_id, qty);

    Some(Allocation {
        institution_id: item.institution_id().clone(),
        request_id: item.request_id,
        catalog_id: item.catalog_id.clone(),
        quantity: qty,
        status,
    })
}

fn distribute_by_priority(store: &InventoryStore, demand: &DemandSnapshot) -> Vec<Allocation> {
    let mut pool: Vec<&DemandItem> = demand.items().iter().collect();
    pool.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.sequence.cmp(&b.sequence))
    });

    let mut allocations = Vec::new();
    for item in pool {
        let available = store.available(&item.catalog_id);
        if available == 0 {
            continue;
        }
        let qty = item.remaining.min(available);
        allocations.extend(grant(store, item, qty));
    }
    allocations
}

fn distribute_proportionally(store: &InventoryStore, demand: &DemandSnapshot) -> Vec<Allocation> {
    let mut allocations = Vec::new();
    for (catalog_id, items) in demand.by_catalog() {
        let available = u64::from(store.available(catalog_id));
        if available == 0 {
            continue;
        }
        let total_need: u64 = items.iter().map(|i| u64::from(i.remaining)).sum();
        if total_need == 0 {
            continue;
        }

        let mut per_institution: BTreeMap<&InstitutionId, Vec<&DemandItem>> = BTreeMap::new();
        for item in items {
            per_institution.entry(item.institution_id()).or_default().push(item);
        }

        // Truncation leftovers stay in stock until the next cycle.
        for requests in per_institution.values() {
            let need: u64 = requests.iter().map(|i| u64::from(i.remaining)).sum();
            let share = (available * need / total_need).min(need);
            let mut left = u32::try_from(share).unwrap_or(u32::MAX);
            for item in requests {
                if left == 0 {
                    break;
                }
                let qty = item.remaining.min(left);
                if let Some(a) = grant(store, item, qty) {
                    left -= a.quantity;
                    allocations.push(a);
                }
            }
        }
    }
    allocations
}

fn distribute_equally(store: &InventoryStore, demand: &DemandSnapshot) -> Vec<Allocation> {
    let mut allocations = Vec::new();
    for (catalog_id, items) in demand.by_catalog() {
        let available = store.available(catalog_id);
        if available == 0 {
            continue;
        }

        let mut per_institution: BTreeMap<&InstitutionId, Vec<&DemandItem>> = BTreeMap::new();
        for item in items {
            per_institution.entry(item.institution_id()).or_default().push(item);
        }
        let k = u32::try_from(per_institution.len()).unwrap_or(u32::MAX);
        let share = available / k;
        if share == 0 {
            continue;
        }

        for requests in per_institution.values() {
            let mut left = share;
            for item in requests {
                if left == 0 {
                    break;
                }
                let qty = item.remaining.min(left);
                if let Some(a) = grant(store, item, qty) {
                    left -= a.quantity;
                    allocations.push(a);
                }
            }
        }
    }
    allocations
}
