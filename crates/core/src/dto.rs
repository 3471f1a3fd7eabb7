//! Transport-facing DTO contracts.

use serde::Serialize;

/// Input (request) DTO supplying field values for create/update.
pub trait CrudRequest: core::fmt::Debug + Send + Sync + 'static {}

/// Output (response) DTO: the entity ID plus a projection of its fields.
pub trait CrudResponse: ContentAlias + Serialize + core::fmt::Debug + Send + Sync + 'static {
    type Id;

    fn id(&self) -> Option<&Self::Id>;
}

/// The plural name under which a page of this type is nested when serialized.
///
/// Override [`ContentAlias::CONTENT_ALIAS`] to pin the name (e.g. `"people"`);
/// otherwise the page serializer derives one from [`ContentAlias::type_name`].
pub trait ContentAlias {
    const CONTENT_ALIAS: Option<&'static str> = None;

    /// Unqualified type name, e.g. `"UserResponse"`.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        short_type_name(core::any::type_name::<Self>())
    }
}

/// Strips the module path and generic arguments from a `type_name` string.
pub fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
