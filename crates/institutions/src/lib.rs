//! Institutions and their requests.
//!
//! Each [`Institution`] exclusively owns its request list and holdings behind
//! its own lock. The [`InstitutionRegistry`] is the lookup table used by the
//! distribution layer and hands out submission sequence numbers.

pub mod institution;
pub mod registry;
pub mod request;

pub use institution::{Contact, Institution, InstitutionKind, RequestCounts};
pub use registry::InstitutionRegistry;
pub use request::{Priority, Request, RequestStatus};
