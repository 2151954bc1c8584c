//! Loan lifecycle: issue on allocation, overdue detection, return-and-reclaim.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use bookdist_core::validation::ensure_quantity;
use bookdist_core::{CatalogId, DomainError, DomainResult, Entity, InstitutionId, LoanId};
use bookdist_inventory::InventoryStore;

use crate::config::DEFAULT_LOAN_PERIOD_DAYS;

/// Stock handed to an institution until it is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    id: LoanId,
    catalog_id: CatalogId,
    institution_id: InstitutionId,
    quantity: u32,
    issued_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
    returned_at: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn id_typed(&self) -> LoanId {
        self.id
    }

    pub fn catalog_id(&self) -> &CatalogId {
        &self.catalog_id
    }

    pub fn institution_id(&self) -> &InstitutionId {
        &self.institution_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }

    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }

    /// Not returned and past its due date. Computed, never stored.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_returned() && now > self.due_at
    }

    /// Whole days past due; 0 when not overdue.
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        if !self.is_overdue(now) {
            return 0;
        }
        (now - self.due_at).num_days()
    }

    fn mark_returned(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.is_returned() {
            return Err(DomainError::AlreadyReturned(self.id));
        }
        self.returned_at = Some(now);
        Ok(())
    }
}

impl Entity for Loan {
    type Id = LoanId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Owner of every loan ever issued. Loans are retained after return.
#[derive(Debug)]
pub struct LoanTracker {
    store: Arc<InventoryStore>,
    loans: RwLock<Vec<Loan>>,
    loan_period: Duration,
}

impl LoanTracker {
    pub fn new(store: Arc<InventoryStore>) -> Self {
        Self::with_loan_period(store, Duration::days(DEFAULT_LOAN_PERIOD_DAYS))
    }

    pub fn with_loan_period(store: Arc<InventoryStore>, loan_period: Duration) -> Self {
        Self {
            store,
            loans: RwLock::new(Vec::new()),
            loan_period,
        }
    }

    pub fn loan_period(&self) -> Duration {
        self.loan_period
    }

    /// Record a new loan due one loan period after `issued_at`.
    pub fn issue(
        &self,
        catalog_id: CatalogId,
        institution_id: InstitutionId,
        quantity: u32,
        issued_at: DateTime<Utc>,
    ) -> DomainResult<Loan> {
        ensure_quantity(quantity)?;
        let loan = Loan {
            id: LoanId::new(),
            catalog_id,
            institution_id,
            quantity,
            issued_at,
            due_at: issued_at + self.loan_period,
            returned_at: None,
        };
        self.loans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(loan.clone());

        info!(
            loan_id = %loan.id,
            catalog_id = %loan.catalog_id,
            institution_id = %loan.institution_id,
            quantity,
            due_at = %loan.due_at,
            "loan issued"
        );
        Ok(loan)
    }

    /// Close a loan and credit its units back to the store.
    ///
    /// The store is credited while the tracker lock is held and the loan is
    /// marked only once the credit went through. Concurrent or repeated calls
    /// credit the stock exactly once, and a refused credit leaves the loan
    /// outstanding.
    pub fn return_loan(&self, loan_id: LoanId, returned_at: DateTime<Utc>) -> DomainResult<Loan> {
        let mut loans = self.loans.write().unwrap_or_else(PoisonError::into_inner);
        let loan = loans
            .iter_mut()
            .find(|l| l.has_id(&loan_id))
            .ok_or_else(|| DomainError::not_found(format!("loan {loan_id}")))?;
        if loan.is_returned() {
            return Err(DomainError::AlreadyReturned(loan_id));
        }

        // Lock order: tracker, then stock slot.
        self.store.return_stock(&loan.catalog_id, loan.quantity)?;
        loan.mark_returned(returned_at)?;
        let loan = loan.clone();
        drop(loans);

        info!(%loan_id, catalog_id = %loan.catalog_id, quantity = loan.quantity, "loan returned");
        Ok(loan)
    }

    pub fn get(&self, loan_id: LoanId) -> Option<Loan> {
        self.loans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|l| l.has_id(&loan_id))
            .cloned()
    }

    /// Every loan, in issue order.
    pub fn loans(&self) -> Vec<Loan> {
        self.loans.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn loans_by_institution(&self, institution_id: &InstitutionId) -> Vec<Loan> {
        self.filter(|l| &l.institution_id == institution_id)
    }

    pub fn overdue_loans(&self, now: DateTime<Utc>) -> Vec<Loan> {
        self.filter(|l| l.is_overdue(now))
    }

    /// Units of `catalog_id` currently out on unreturned loans.
    pub fn outstanding_quantity(&self, catalog_id: &CatalogId) -> u64 {
        self.loans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| !l.is_returned() && &l.catalog_id == catalog_id)
            .map(|l| u64::from(l.quantity))
            .sum()
    }

    fn filter(&self, pred: impl Fn(&Loan) -> bool) -> Vec<Loan> {
        self.loans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| pred(l))
            .cloned()
            .collect()
    }
}
