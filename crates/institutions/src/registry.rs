use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::info;

use bookdist_core::{CatalogId, DomainError, DomainResult, InstitutionId};

use crate::institution::Institution;
use crate::request::{Priority, Request};

/// Lookup table of registered institutions.
///
/// Also the source of submission sequence numbers, which are strictly
/// increasing across all institutions.
#[derive(Debug, Default)]
pub struct InstitutionRegistry {
    institutions: RwLock<BTreeMap<InstitutionId, Arc<Institution>>>,
    next_sequence: AtomicU64,
}

impl InstitutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new institution. Ids are unique.
    pub fn register(&self, institution: Institution) -> DomainResult<Arc<Institution>> {
        let id = institution.id_typed().clone();
        let mut map = self.institutions.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(&id) {
            return Err(DomainError::conflict(format!("institution {id} already registered")));
        }
        let institution = Arc::new(institution);
        map.insert(id.clone(), Arc::clone(&institution));
        drop(map);

        info!(institution_id = %id, name = institution.name(), kind = %institution.kind(), "institution registered");
        Ok(institution)
    }

    pub fn get(&self, id: &InstitutionId) -> Option<Arc<Institution>> {
        self.institutions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn require(&self, id: &InstitutionId) -> DomainResult<Arc<Institution>> {
        self.get(id)
            .ok_or_else(|| DomainError::not_found(format!("institution {id}")))
    }

    /// All institutions at this instant, ordered by id.
    pub fn snapshot(&self) -> Vec<Arc<Institution>> {
        self.institutions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.institutions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a request for `institution_id` and append it to that
    /// institution's list. Returns a copy of the stored request.
    pub fn submit(
        &self,
        institution_id: &InstitutionId,
        catalog_id: CatalogId,
        quantity: u32,
        priority: Priority,
        submitted_at: DateTime<Utc>,
    ) -> DomainResult<Request> {
        let institution = self.require(institution_id)?;
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let request = Request::new(catalog_id, quantity, priority, sequence, submitted_at)?;
        institution.submit(request.clone());

        info!(
            institution_id = %institution_id,
            request_id = %request.id_typed(),
            catalog_id = %request.catalog_id(),
            quantity,
            %priority,
            "request submitted"
        );
        Ok(request)
    }
}
