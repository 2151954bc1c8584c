use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookdist_core::validation::ensure_quantity;
use bookdist_core::{CatalogId, DomainError, DomainResult, Entity, RequestId};

/// Demand urgency. Declaration order is the ranking: `Low < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Numeric level, 1 (low) to 4 (critical).
    pub fn level(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Critical => 4,
        }
    }

    pub fn from_level(level: u8) -> DomainResult<Self> {
        match level {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            4 => Ok(Priority::Critical),
            other => Err(DomainError::invalid_input(format!(
                "priority level {other} outside 1..=4"
            ))),
        }
    }
}

impl core::fmt::Display for Priority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        })
    }
}

/// Request status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    PartiallyFulfilled,
    Fulfilled,
    Rejected,
}

impl RequestStatus {
    /// Still eligible for allocation.
    pub fn is_open(self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::PartiallyFulfilled)
    }
}

impl core::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::PartiallyFulfilled => "Partially Fulfilled",
            RequestStatus::Fulfilled => "Fulfilled",
            RequestStatus::Rejected => "Rejected",
        })
    }
}

/// A single demand line of one institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    id: RequestId,
    catalog_id: CatalogId,
    quantity_requested: u32,
    quantity_fulfilled: u32,
    priority: Priority,
    status: RequestStatus,
    created_at: DateTime<Utc>,
    sequence: u64,
}

impl Request {
    /// Build a pending request.
    ///
    /// `sequence` is the registry-wide submission counter; it is the explicit
    /// tie-break key between requests of equal priority.
    pub fn new(
        catalog_id: CatalogId,
        quantity: u32,
        priority: Priority,
        sequence: u64,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        ensure_quantity(quantity)?;
        Ok(Self {
            id: RequestId::new(),
            catalog_id,
            quantity_requested: quantity,
            quantity_fulfilled: 0,
            priority,
            status: RequestStatus::Pending,
            created_at,
            sequence,
        })
    }

    pub fn id_typed(&self) -> RequestId {
        self.id
    }

    pub fn catalog_id(&self) -> &CatalogId {
        &self.catalog_id
    }

    pub fn quantity_requested(&self) -> u32 {
        self.quantity_requested
    }

    pub fn quantity_fulfilled(&self) -> u32 {
        self.quantity_fulfilled
    }

    /// Requested minus fulfilled.
    pub fn remaining(&self) -> u32 {
        self.quantity_requested - self.quantity_fulfilled
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Record `qty` more units delivered and recompute the status.
    ///
    /// `qty == 0` is a no-op. Fulfilled never exceeds requested.
    pub fn fulfill_partial(&mut self, qty: u32) -> DomainResult<RequestStatus> {
        if qty == 0 {
            return Ok(self.status);
        }
        if !self.is_open() {
            return Err(DomainError::invariant(format!(
                "request {} is {} and cannot receive stock",
                self.id, self.status
            )));
        }
        if qty > self.remaining() {
            return Err(DomainError::invariant(format!(
                "request {} needs {} but {qty} were offered",
                self.id,
                self.remaining()
            )));
        }

        self.quantity_fulfilled += qty;
        self.status = if self.quantity_fulfilled == self.quantity_requested {
            RequestStatus::Fulfilled
        } else {
            RequestStatus::PartiallyFulfilled
        };
        Ok(self.status)
    }

    /// PENDING → REJECTED. Any other starting status is refused.
    pub fn reject(&mut self) -> DomainResult<()> {
        if self.status != RequestStatus::Pending {
            return Err(DomainError::invariant(format!(
                "only pending requests can be rejected (request {} is {})",
                self.id, self.status
            )));
        }
        self.status = RequestStatus::Rejected;
        Ok(())
    }
}

impl Entity for Request {
    type Id = RequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
