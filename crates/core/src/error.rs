//! Domain error model.

use thiserror::Error;

use crate::id::{CatalogId, LoanId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// lookups, invariants). `InsufficientStock` is an *expected* outcome during
/// allocation and callers are free to treat it as a plain "no".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation at construction time (malformed id, year, quantity, contact).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced institution, catalog entry, request or loan does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An allocation asked for more units than are currently available.
    #[error("insufficient stock for {catalog_id} (requested {requested}, available {available})")]
    InsufficientStock {
        catalog_id: CatalogId,
        requested: u32,
        available: u32,
    },

    /// A loan was already returned; stock must not be credited twice.
    #[error("loan {0} already returned")]
    AlreadyReturned(LoanId),

    /// A domain invariant was violated (e.g. over-fulfilling a request).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A conflicting structural change (e.g. duplicate registration).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn insufficient_stock(catalog_id: CatalogId, requested: u32, available: u32) -> Self {
        Self::InsufficientStock {
            catalog_id,
            requested,
            available,
        }
    }

    /// True for the routine "not enough stock" outcome.
    pub fn is_insufficient_stock(&self) -> bool {
        matches!(self, Self::InsufficientStock { .. })
    }
}
