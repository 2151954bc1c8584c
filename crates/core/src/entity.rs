//! Things with a stable identity: catalog entries, institutions, requests, loans.

pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Lookup helper for `iter().find(|e| e.has_id(&id))`.
    fn has_id(&self, id: &Self::Id) -> bool {
        self.id() == id
    }
}
