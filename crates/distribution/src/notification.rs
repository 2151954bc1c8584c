//! Events published by the distribution layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookdist_core::{InstitutionId, LoanId};
use bookdist_events::Event;

use crate::strategy::AllocationStrategy;

/// Event: one institution received stock in a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionNotice {
    pub institution_id: InstitutionId,
    pub institution_name: String,
    pub cycle: u64,
    /// Requests that reached FULFILLED in this cycle.
    pub newly_fulfilled: usize,
    /// Requests left PARTIALLY_FULFILLED after this cycle's grants.
    pub partially_fulfilled: usize,
    pub units_received: u64,
    pub occurred_at: DateTime<Utc>,
}

impl InstitutionNotice {
    pub fn message(&self) -> String {
        let mut msg = format!(
            "Distribution completed. {} requests fulfilled.",
            self.newly_fulfilled
        );
        if self.partially_fulfilled > 0 {
            msg.push_str(&format!(" {} partially fulfilled.", self.partially_fulfilled));
        }
        msg
    }
}

/// Event: a cycle finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleCompleted {
    pub cycle: u64,
    pub strategy: AllocationStrategy,
    pub allocations: usize,
    pub units_allocated: u64,
    pub loans_issued: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Event: an overdue check found loans past their due date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueDetected {
    pub loan_ids: Vec<LoanId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionEvent {
    InstitutionNotified(InstitutionNotice),
    CycleCompleted(CycleCompleted),
    OverdueDetected(OverdueDetected),
}

impl Event for DistributionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DistributionEvent::InstitutionNotified(_) => "distribution.institution.notified",
            DistributionEvent::CycleCompleted(_) => "distribution.cycle.completed",
            DistributionEvent::OverdueDetected(_) => "distribution.loans.overdue",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DistributionEvent::InstitutionNotified(e) => e.occurred_at,
            DistributionEvent::CycleCompleted(e) => e.occurred_at,
            DistributionEvent::OverdueDetected(e) => e.occurred_at,
        }
    }
}
