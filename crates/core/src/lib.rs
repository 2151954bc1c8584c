//! Domain building blocks shared by every `bookdist` crate.
//!
//! Identifiers, the error model and field validation. No locking, no IO.

pub mod entity;
pub mod error;
pub mod id;
pub mod validation;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CatalogId, InstitutionId, LoanId, RequestId};
