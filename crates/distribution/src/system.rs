//! Driver-facing facade over the whole distribution engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use bookdist_core::{CatalogId, DomainError, DomainResult, InstitutionId, LoanId, RequestId};
use bookdist_events::{EventBus, InMemoryEventBus, Subscription};
use bookdist_institutions::{Institution, InstitutionRegistry, Priority};
use bookdist_inventory::{CatalogEntry, Category, InventoryStore, StockLevel};

use crate::config::SystemConfig;
use crate::coordinator::{CycleReport, DistributionCoordinator};
use crate::loans::{Loan, LoanTracker};
use crate::notification::{DistributionEvent, OverdueDetected};
use crate::snapshot::{DistributionSummary, InstitutionRow, InventoryRow, SystemSnapshot};
use crate::strategy::AllocationStrategy;
use crate::waiting_list::WaitingListManager;

/// Inventory lookup criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Case-insensitive substring of the title.
    Title(String),
    /// Case-insensitive substring of the author.
    Author(String),
    Category(Category),
}

/// One inventory, many institutions, one coordinator.
///
/// All methods take `&self`; share the system across threads with `Arc`.
pub struct BooksDistributionSystem<B = InMemoryEventBus<DistributionEvent>>
where
    B: EventBus<DistributionEvent>,
{
    config: SystemConfig,
    store: Arc<InventoryStore>,
    registry: Arc<InstitutionRegistry>,
    loans: Arc<LoanTracker>,
    waiting: WaitingListManager,
    bus: Arc<B>,
    coordinator: DistributionCoordinator<Arc<B>>,
}

impl BooksDistributionSystem {
    /// System with an in-memory event bus.
    pub fn new(config: SystemConfig) -> DomainResult<Self> {
        Self::with_bus(config, Arc::new(InMemoryEventBus::new()))
    }
}

impl<B> BooksDistributionSystem<B>
where
    B: EventBus<DistributionEvent>,
{
    pub fn with_bus(config: SystemConfig, bus: Arc<B>) -> DomainResult<Self> {
        let loan_period = config.loan_period()?;
        let store = InventoryStore::arc();
        let registry = InstitutionRegistry::arc();
        let loans = Arc::new(LoanTracker::with_loan_period(Arc::clone(&store), loan_period));
        let coordinator = DistributionCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&loans),
            Arc::clone(&bus),
            config.strategy,
        );

        info!(loan_period_days = config.loan_period_days, strategy = %config.strategy, "distribution system ready");
        Ok(Self {
            config,
            store,
            registry,
            loans,
            waiting: WaitingListManager::new(),
            bus,
            coordinator,
        })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn inventory(&self) -> &InventoryStore {
        &self.store
    }

    pub fn registry(&self) -> &InstitutionRegistry {
        &self.registry
    }

    pub fn loan_tracker(&self) -> &LoanTracker {
        &self.loans
    }

    pub fn waiting_list(&self) -> &WaitingListManager {
        &self.waiting
    }

    pub fn institution(&self, id: &InstitutionId) -> Option<Arc<Institution>> {
        self.registry.get(id)
    }

    /// Add copies of a title; returns the new available quantity.
    pub fn add_stock(&self, entry: CatalogEntry, quantity: u32) -> DomainResult<u32> {
        self.store.add_stock(entry, quantity)
    }

    pub fn register_institution(&self, institution: Institution) -> DomainResult<Arc<Institution>> {
        self.coordinator.register_institution(institution)
    }

    pub fn submit_request(
        &self,
        institution_id: &InstitutionId,
        catalog_id: CatalogId,
        quantity: u32,
        priority: Priority,
    ) -> DomainResult<RequestId> {
        self.submit_request_at(institution_id, catalog_id, quantity, priority, Utc::now())
    }

    /// Queue a request for the next cycle.
    ///
    /// The title and the institution must both exist. When the title is
    /// short right now, the request is also written to the waiting list.
    pub fn submit_request_at(
        &self,
        institution_id: &InstitutionId,
        catalog_id: CatalogId,
        quantity: u32,
        priority: Priority,
        submitted_at: DateTime<Utc>,
    ) -> DomainResult<RequestId> {
        if !self.store.contains(&catalog_id) {
            return Err(DomainError::not_found(format!("catalog entry {catalog_id}")));
        }
        let available = self.store.available(&catalog_id);
        let request = self
            .registry
            .submit(institution_id, catalog_id.clone(), quantity, priority, submitted_at)?;

        if available < quantity {
            self.waiting
                .add_entry(catalog_id, institution_id.clone(), quantity, priority, submitted_at);
        }
        Ok(request.id_typed())
    }

    pub fn strategy(&self) -> AllocationStrategy {
        self.coordinator.strategy()
    }

    pub fn set_strategy(&self, strategy: AllocationStrategy) {
        self.coordinator.set_strategy(strategy);
    }

    pub fn run_cycle(&self) -> CycleReport {
        self.coordinator.run_cycle()
    }

    pub fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleReport {
        self.coordinator.run_cycle_at(now)
    }

    pub fn return_loan(&self, loan_id: LoanId) -> DomainResult<Loan> {
        self.return_loan_at(loan_id, Utc::now())
    }

    pub fn return_loan_at(&self, loan_id: LoanId, now: DateTime<Utc>) -> DomainResult<Loan> {
        self.loans.return_loan(loan_id, now)
    }

    pub fn check_overdue(&self) -> Vec<Loan> {
        self.check_overdue_at(Utc::now())
    }

    /// Loans past due at `now`. Any hit is logged and published.
    pub fn check_overdue_at(&self, now: DateTime<Utc>) -> Vec<Loan> {
        let overdue = self.loans.overdue_loans(now);
        if overdue.is_empty() {
            return overdue;
        }

        for loan in &overdue {
            warn!(
                loan_id = %loan.id_typed(),
                institution_id = %loan.institution_id(),
                catalog_id = %loan.catalog_id(),
                quantity = loan.quantity(),
                days_overdue = loan.days_overdue(now),
                "loan overdue"
            );
        }
        let event = DistributionEvent::OverdueDetected(OverdueDetected {
            loan_ids: overdue.iter().map(Loan::id_typed).collect(),
            occurred_at: now,
        });
        if let Err(e) = self.bus.publish(event) {
            warn!(error = %e, "failed to publish overdue notice");
        }
        overdue
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<StockLevel> {
        match query {
            SearchQuery::Title(keyword) => self.store.search_by_title(keyword),
            SearchQuery::Author(keyword) => self.store.search_by_author(keyword),
            SearchQuery::Category(category) => self.store.by_category(*category),
        }
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> Subscription<DistributionEvent> {
        self.bus.subscribe()
    }

    pub fn summary(&self) -> DistributionSummary {
        let institutions = self.registry.snapshot();
        let mut summary = DistributionSummary {
            titles: self.store.title_count(),
            units_available: self.store.total_units(),
            institutions: institutions.len(),
            waiting_entries: self.waiting.total(),
            ..DistributionSummary::default()
        };
        for inst in &institutions {
            let counts = inst.request_counts();
            summary.total_requests += counts.total;
            summary.fulfilled += counts.fulfilled;
            summary.partially_fulfilled += counts.partially_fulfilled;
            summary.pending += counts.pending;
            summary.rejected += counts.rejected;
        }
        for loan in self.loans.loans().iter().filter(|l| !l.is_returned()) {
            summary.active_loans += 1;
            summary.units_on_loan += u64::from(loan.quantity());
        }
        summary
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> SystemSnapshot {
        SystemSnapshot {
            taken_at: now,
            strategy: self.strategy(),
            summary: self.summary(),
            inventory: self.store.list().iter().map(InventoryRow::from_level).collect(),
            institutions: self
                .registry
                .snapshot()
                .iter()
                .map(|i| InstitutionRow::from_institution(i))
                .collect(),
            loans: self.loans.loans(),
            waiting: self.waiting.summary(),
        }
    }
}
