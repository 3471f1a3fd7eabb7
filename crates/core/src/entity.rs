//! Entity trait: identity + continuity across state changes.

/// An identifiable domain object managed by the CRUD layer.
///
/// `id()` is `None` while the entity is transient and becomes `Some` once a
/// store has persisted it. After that the identifier never changes and is
/// never a merge target.
///
/// `version()` is the optimistic-concurrency token. Stores assign the initial
/// value on create and bump it by one on every successful update; client input
/// never sets it. Entities that return `None` opt out of conflict detection.
pub trait Entity: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    /// Short type name used in events, filters and diagnostics (e.g. `"User"`).
    const TYPE_NAME: &'static str;

    /// Returns the entity identifier, if one has been assigned.
    fn id(&self) -> Option<&Self::Id>;

    /// Assigns the identifier. Only stores call this, on first persistence.
    fn set_id(&mut self, id: Self::Id);

    fn version(&self) -> Option<u64> {
        None
    }

    fn set_version(&mut self, _version: u64) {}

    /// Identity equality: both sides carry an ID and the IDs are equal.
    ///
    /// An entity without an ID is never the same as any other instance,
    /// itself included.
    fn same_identity(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Implements `PartialEq` and `Hash` for an entity type in terms of its identity.
///
/// Equality follows [`Entity::same_identity`]. The hash is constant for all
/// instances of the type so it stays stable when an ID is assigned later.
/// `Eq` is intentionally not implemented: an ID-less entity is not equal to itself.
#[macro_export]
macro_rules! entity_identity {
    ($t:ty) => {
        impl ::core::cmp::PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                $crate::Entity::same_identity(self, other)
            }
        }

        impl ::core::hash::Hash for $t {
            fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                ::core::hash::Hash::hash(<$t as $crate::Entity>::TYPE_NAME, state);
            }
        }
    };
}
