use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use bookdist_core::validation::{ensure_email, ensure_not_blank, ensure_phone};
use bookdist_core::{CatalogId, DomainError, DomainResult, Entity, InstitutionId, RequestId};

use crate::request::{Request, RequestStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionKind {
    PrimarySchool,
    SecondarySchool,
    HighSchool,
    College,
    University,
    Library,
    ResearchCenter,
}

impl InstitutionKind {
    pub fn name(self) -> &'static str {
        match self {
            InstitutionKind::PrimarySchool => "Primary School",
            InstitutionKind::SecondarySchool => "Secondary School",
            InstitutionKind::HighSchool => "High School",
            InstitutionKind::College => "College",
            InstitutionKind::University => "University",
            InstitutionKind::Library => "Library",
            InstitutionKind::ResearchCenter => "Research Center",
        }
    }
}

impl core::fmt::Display for InstitutionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    email: String,
    phone: String,
}

impl Contact {
    pub fn new(email: impl Into<String>, phone: impl Into<String>) -> DomainResult<Self> {
        let email = email.into();
        let phone = phone.into();
        ensure_email(&email)?;
        ensure_phone(&phone)?;
        Ok(Self { email, phone })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }
}

/// Per-status tally of an institution's requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCounts {
    pub total: usize,
    pub pending: usize,
    pub partially_fulfilled: usize,
    pub fulfilled: usize,
    pub rejected: usize,
}

#[derive(Debug, Default)]
struct InstitutionState {
    holdings: BTreeMap<CatalogId, u32>,
    requests: Vec<Request>,
}

/// A school, college or library competing for stock.
///
/// Identity is immutable; holdings and requests live behind the
/// institution's own lock and are never shared with another institution.
#[derive(Debug)]
pub struct Institution {
    id: InstitutionId,
    name: String,
    kind: InstitutionKind,
    location: String,
    student_count: u32,
    contact: Option<Contact>,
    state: Mutex<InstitutionState>,
}

impl Institution {
    pub fn new(
        id: InstitutionId,
        name: impl Into<String>,
        kind: InstitutionKind,
        location: impl Into<String>,
        student_count: u32,
    ) -> DomainResult<Self> {
        let name = name.into();
        let location = location.into();
        ensure_not_blank("institution name", &name)?;
        ensure_not_blank("location", &location)?;

        Ok(Self {
            id,
            name,
            kind,
            location,
            student_count,
            contact: None,
            state: Mutex::new(InstitutionState::default()),
        })
    }

    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contact = Some(contact);
        self
    }

    fn state(&self) -> MutexGuard<'_, InstitutionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id_typed(&self) -> &InstitutionId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> InstitutionKind {
        self.kind
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn student_count(&self) -> u32 {
        self.student_count
    }

    pub fn contact(&self) -> Option<&Contact> {
        self.contact.as_ref()
    }

    /// Append a request to this institution's list.
    pub fn submit(&self, request: Request) -> RequestId {
        let id = request.id_typed();
        self.state().requests.push(request);
        id
    }

    /// Open requests (pending or partially fulfilled), in insertion order.
    pub fn pending(&self) -> Vec<Request> {
        self.state()
            .requests
            .iter()
            .filter(|r| r.is_open())
            .cloned()
            .collect()
    }

    /// Every request ever submitted, in insertion order.
    pub fn requests(&self) -> Vec<Request> {
        self.state().requests.clone()
    }

    pub fn request(&self, request_id: RequestId) -> Option<Request> {
        self.state()
            .requests
            .iter()
            .find(|r| r.has_id(&request_id))
            .cloned()
    }

    /// Advance a request's fulfilled quantity. Holdings are not touched;
    /// callers pair this with [`Institution::receive_books`].
    pub fn fulfill_partial(&self, request_id: RequestId, qty: u32) -> DomainResult<RequestStatus> {
        let mut state = self.state();
        let request = state
            .requests
            .iter_mut()
            .find(|r| r.has_id(&request_id))
            .ok_or_else(|| {
                DomainError::not_found(format!("request {request_id} at institution {}", self.id))
            })?;
        let status = request.fulfill_partial(qty)?;
        debug!(institution_id = %self.id, %request_id, quantity = qty, %status, "request advanced");
        Ok(status)
    }

    pub fn reject(&self, request_id: RequestId) -> DomainResult<()> {
        let mut state = self.state();
        let request = state
            .requests
            .iter_mut()
            .find(|r| r.has_id(&request_id))
            .ok_or_else(|| {
                DomainError::not_found(format!("request {request_id} at institution {}", self.id))
            })?;
        request.reject()
    }

    /// Credit received copies to holdings.
    pub fn receive_books(&self, catalog_id: &CatalogId, qty: u32) {
        let mut state = self.state();
        let held = state.holdings.entry(catalog_id.clone()).or_insert(0);
        *held = held.saturating_add(qty);
    }

    /// Copies of `catalog_id` received so far.
    pub fn holding(&self, catalog_id: &CatalogId) -> u32 {
        self.state().holdings.get(catalog_id).copied().unwrap_or(0)
    }

    pub fn holdings(&self) -> BTreeMap<CatalogId, u32> {
        self.state().holdings.clone()
    }

    /// Shortfall against `books_per_student` copies for every student.
    pub fn calculate_need(&self, catalog_id: &CatalogId, books_per_student: u32) -> u64 {
        let needed = u64::from(self.student_count) * u64::from(books_per_student);
        needed.saturating_sub(u64::from(self.holding(catalog_id)))
    }

    pub fn request_counts(&self) -> RequestCounts {
        let state = self.state();
        let mut counts = RequestCounts {
            total: state.requests.len(),
            ..RequestCounts::default()
        };
        for r in &state.requests {
            match r.status() {
                RequestStatus::Pending => counts.pending += 1,
                RequestStatus::PartiallyFulfilled => counts.partially_fulfilled += 1,
                RequestStatus::Fulfilled => counts.fulfilled += 1,
                RequestStatus::Rejected => counts.rejected += 1,
            }
        }
        counts
    }
}

impl Entity for Institution {
    type Id = InstitutionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Priority;
    use chrono::Utc;

    fn school() -> Institution {
        Institution::new(
            InstitutionId::parse("INST-001").unwrap(),
            "Gandhi Memorial High School",
            InstitutionKind::HighSchool,
            "New Delhi",
            350,
        )
        .unwrap()
    }

    fn isbn(raw: &str) -> CatalogId {
        CatalogId::parse(raw).unwrap()
    }

    fn request(raw: &str, qty: u32, seq: u64) -> Request {
        Request::new(isbn(raw), qty, Priority::Medium, seq, Utc::now()).unwrap()
    }

    #[test]
    fn rejects_blank_name() {
        let err = Institution::new(
            InstitutionId::parse("INST-9").unwrap(),
            " ",
            InstitutionKind::Library,
            "Chennai",
            10,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn contact_is_validated() {
        assert!(Contact::new("office@gmhs.edu.in", "9876543210").is_ok());
        assert!(Contact::new("office-at-gmhs", "9876543210").is_err());
        assert!(Contact::new("office@gmhs.edu.in", "12345").is_err());

        let inst = school().with_contact(Contact::new("office@gmhs.edu.in", "9876543210").unwrap());
        assert_eq!(inst.contact().unwrap().phone(), "9876543210");
    }

    #[test]
    fn pending_keeps_insertion_order_and_skips_closed() {
        let inst = school();
        let a = inst.submit(request("1000000001", 5, 1));
        let b = inst.submit(request("1000000002", 5, 2));
        let c = inst.submit(request("1000000003", 5, 3));

        inst.fulfill_partial(b, 5).unwrap();
        inst.fulfill_partial(c, 2).unwrap();

        let ids: Vec<_> = inst.pending().iter().map(|r| r.id_typed()).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn fulfill_unknown_request_is_not_found() {
        let inst = school();
        let err = inst.fulfill_partial(RequestId::new(), 1).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn holdings_are_independent_of_requests() {
        let inst = school();
        let id = isbn("1000000001");
        let req = inst.submit(request("1000000001", 10, 1));

        inst.receive_books(&id, 4);
        inst.receive_books(&id, 3);

        assert_eq!(inst.holding(&id), 7);
        assert_eq!(inst.holdings(), BTreeMap::from([(id.clone(), 7)]));
        assert_eq!(inst.request(req).unwrap().quantity_fulfilled(), 0);
        assert_eq!(inst.calculate_need(&id, 1), 343);
    }

    #[test]
    fn request_counts_tally_statuses() {
        let inst = school();
        let a = inst.submit(request("1000000001", 5, 1));
        let b = inst.submit(request("1000000002", 5, 2));
        let c = inst.submit(request("1000000003", 5, 3));
        inst.submit(request("1000000004", 5, 4));
        inst.fulfill_partial(a, 5).unwrap();
        inst.fulfill_partial(b, 1).unwrap();
        inst.reject(c).unwrap();

        assert_eq!(
            inst.request_counts(),
            RequestCounts {
                total: 4,
                pending: 1,
                partially_fulfilled: 1,
                fulfilled: 1,
                rejected: 1,
            }
        );
    }
}
