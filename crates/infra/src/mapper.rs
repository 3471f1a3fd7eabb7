//! DTO <-> entity translation.

use crudkit_core::{CrudRequest, CrudResponse, Entity, IgnoredFields, Merge, MergeError, merge};

/// Translates between request/response DTOs and entities.
///
/// `to_update` must only write fields present on the request; the provided
/// [`merge_request`] does that for any entity with a
/// [`partial_merge!`](crudkit_core::partial_merge) impl.
pub trait CrudMapper: Send + Sync {
    type Entity: Entity;
    type Request: CrudRequest;
    type Response: CrudResponse;

    /// Builds a transient (ID-less) entity from a create request.
    fn to_create(&self, request: &Self::Request) -> Self::Entity;

    /// Applies a request's present fields onto an existing entity.
    fn to_update(
        &self,
        request: &Self::Request,
        entity: &mut Self::Entity,
        ignored: &IgnoredFields,
    ) -> Result<(), MergeError>;

    fn to_response(&self, entity: &Self::Entity) -> Self::Response;
}

/// Default `to_update` body: partial merge of the request onto the entity.
pub fn merge_request<Q, T>(request: &Q, entity: &mut T, ignored: &IgnoredFields) -> Result<(), MergeError>
where
    T: Merge<Q>,
{
    merge(request, entity, ignored).map(|_| ())
}
