//! Entity trait: identity + continuity across state changes.

/// A stored record with a stable identifier.
///
/// Items and requests are both entities: two records with the same id are the
/// same record, whatever their other fields say. Repositories key on this.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
