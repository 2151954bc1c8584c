//! Allocation cycles.
//!
//! The coordinator serializes cycles, strategy changes and institution
//! registration behind one coarse lock. Inside a cycle it only calls into
//! components that guard their own state, one at a time.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use bookdist_core::{DomainResult, InstitutionId};
use bookdist_events::EventBus;
use bookdist_institutions::{Institution, InstitutionRegistry, RequestStatus};
use bookdist_inventory::InventoryStore;

use crate::loans::{Loan, LoanTracker};
use crate::notification::{CycleCompleted, DistributionEvent, InstitutionNotice};
use crate::strategy::{Allocation, AllocationStrategy, DemandSnapshot};

/// Outcome of one [`DistributionCoordinator::run_cycle`].
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub strategy: AllocationStrategy,
    pub allocations: Vec<Allocation>,
    pub loans: Vec<Loan>,
    pub notices: Vec<InstitutionNotice>,
    pub ran_at: DateTime<Utc>,
}

impl CycleReport {
    pub fn units_allocated(&self) -> u64 {
        self.allocations.iter().map(|a| u64::from(a.quantity)).sum()
    }

    /// Units granted to one institution in this cycle.
    pub fn units_for(&self, institution_id: &InstitutionId) -> u64 {
        self.allocations
            .iter()
            .filter(|a| &a.institution_id == institution_id)
            .map(|a| u64::from(a.quantity))
            .sum()
    }
}

#[derive(Debug)]
struct CycleState {
    strategy: AllocationStrategy,
    cycles_completed: u64,
}

pub struct DistributionCoordinator<B> {
    store: Arc<InventoryStore>,
    registry: Arc<InstitutionRegistry>,
    loans: Arc<LoanTracker>,
    bus: B,
    cycle: Mutex<CycleState>,
}

impl<B> DistributionCoordinator<B>
where
    B: EventBus<DistributionEvent>,
{
    pub fn new(
        store: Arc<InventoryStore>,
        registry: Arc<InstitutionRegistry>,
        loans: Arc<LoanTracker>,
        bus: B,
        strategy: AllocationStrategy,
    ) -> Self {
        Self {
            store,
            registry,
            loans,
            bus,
            cycle: Mutex::new(CycleState {
                strategy,
                cycles_completed: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CycleState> {
        self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn strategy(&self) -> AllocationStrategy {
        self.state().strategy
    }

    /// Takes effect from the next cycle; a running cycle keeps its strategy.
    pub fn set_strategy(&self, strategy: AllocationStrategy) {
        let mut state = self.state();
        let previous = std::mem::replace(&mut state.strategy, strategy);
        info!(from = %previous, to = %strategy, "allocation strategy changed");
    }

    pub fn cycles_completed(&self) -> u64 {
        self.state().cycles_completed
    }

    /// Register an institution, serialized with running cycles.
    pub fn register_institution(&self, institution: Institution) -> DomainResult<Arc<Institution>> {
        let _cycle = self.state();
        self.registry.register(institution)
    }

    pub fn run_cycle(&self) -> CycleReport {
        self.run_cycle_at(Utc::now())
    }

    /// Run one allocation cycle with `now` as the business time.
    ///
    /// Grants made before a failure are kept; nothing is rolled back.
    pub fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleReport {
        let mut state = self.state();
        let institutions = self.registry.snapshot();
        let demand = DemandSnapshot::capture(&institutions, now);
        self.settle(&mut state, &institutions, &demand)
    }

    /// Allocate against a captured demand, issue loans and notify. Business
    /// time is the capture time of `demand`.
    fn settle(&self, state: &mut CycleState, institutions: &[Arc<Institution>], demand: &DemandSnapshot) -> CycleReport {
        let strategy = state.strategy;
        let cycle = state.cycles_completed + 1;
        let now = demand.taken_at();
        info!(cycle, %strategy, pending = demand.len(), "distribution cycle started");

        let allocations = strategy.distribute(&self.store, demand);

        let mut loans = Vec::with_capacity(allocations.len());
        for a in &allocations {
            match self
                .loans
                .issue(a.catalog_id.clone(), a.institution_id.clone(), a.quantity, now)
            {
                Ok(loan) => loans.push(loan),
                Err(e) => warn!(request_id = %a.request_id, error = %e, "failed to issue loan"),
            }
        }

        let notices = build_notices(institutions, &allocations, cycle, now);
        for notice in &notices {
            info!(institution_id = %notice.institution_id, message = %notice.message(), "institution notified");
            self.publish(DistributionEvent::InstitutionNotified(notice.clone()));
        }

        let report = CycleReport {
            cycle,
            strategy,
            allocations,
            loans,
            notices,
            ran_at: now,
        };
        self.publish(DistributionEvent::CycleCompleted(CycleCompleted {
            cycle,
            strategy,
            allocations: report.allocations.len(),
            units_allocated: report.units_allocated(),
            loans_issued: report.loans.len(),
            occurred_at: now,
        }));

        state.cycles_completed = cycle;
        info!(
            cycle,
            %strategy,
            allocations = report.allocations.len(),
            units = report.units_allocated(),
            "distribution cycle completed"
        );
        report
    }

    fn publish(&self, event: DistributionEvent) {
        if let Err(e) = self.bus.publish(event) {
            warn!(error = %e, "failed to publish distribution event");
        }
    }
}

/// One notice per institution that received stock, in registry order.
fn build_notices(
    institutions: &[Arc<Institution>],
    allocations: &[Allocation],
    cycle: u64,
    now: DateTime<Utc>,
) -> Vec<InstitutionNotice> {
    let mut by_institution: BTreeMap<&InstitutionId, Vec<&Allocation>> = BTreeMap::new();
    for a in allocations {
        by_institution.entry(&a.institution_id).or_default().push(a);
    }

    institutions
        .iter()
        .filter_map(|inst| {
            let grants = by_institution.get(inst.id_typed())?;
            let count = |status: RequestStatus| grants.iter().filter(|a| a.status == status).count();
            Some(InstitutionNotice {
                institution_id: inst.id_typed().clone(),
                institution_name: inst.name().to_string(),
                cycle,
                newly_fulfilled: count(RequestStatus::Fulfilled),
                partially_fulfilled: count(RequestStatus::PartiallyFulfilled),
                units_received: grants.iter().map(|a| u64::from(a.quantity)).sum(),
                occurred_at: now,
            })
        })
        .collect()
}
