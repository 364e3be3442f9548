//! Entity trait: records that keep their identity while their attributes change.

/// Entity marker + minimal interface.
///
/// Catalog records (service types, services, materials, ...) implement this
/// with their natural or surrogate key.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
