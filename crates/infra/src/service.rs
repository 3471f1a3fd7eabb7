//! CRUD orchestration (application-level).
//!
//! `CrudService` composes an [`EntityStore`], a [`CrudMapper`], the
//! [`CrudHooks`] extension points and an [`EventPublisher`]:
//!
//! ```text
//! request DTO
//!   ↓ mapper.to_create / to_update (+ on_create / on_update hook)
//! transaction {
//!   store.create / update / delete
//!   ↓ on_*_event hook → publisher.publish   (in-transaction listeners, may veto)
//! }
//!   ↓ commit → after-commit listeners        (rollback → discarded)
//! mapper.to_response
//! ```
//!
//! Reads never publish events and run outside any transaction.

use std::marker::PhantomData;

use tracing::{debug, warn};

use crudkit_core::{CrudResult, Entity, IgnoredFields, Merge, Page, PageRequest, Sort, merge};
use crudkit_events::{EntityEvent, Event, EventPublisher, NoopPublisher, PendingEvents};

use crate::mapper::CrudMapper;
use crate::store::EntityStore;

/// Per-entity extension points of [`CrudService`].
///
/// Every method has a default: hooks do nothing, the ignore list is
/// `{id, version, createdAt, updatedAt}` and no events are emitted. Override
/// `on_*_event` with e.g. `Some(EntityEvent::created(entity.clone()))` to
/// publish the standard notification.
pub trait CrudHooks<T: Entity, Q>: Send + Sync {
    /// Runs on the freshly mapped entity before it is persisted.
    fn on_create(&self, _request: &Q, _entity: &mut T) {}

    /// Runs after the request was merged onto the fetched entity, before save.
    fn on_update(&self, _request: &Q, _entity: &mut T) {}

    fn ignored_merge_fields(&self) -> IgnoredFields {
        IgnoredFields::default()
    }

    fn on_create_event(&self, _entity: &T) -> Option<EntityEvent<T>> {
        None
    }

    fn on_update_event(&self, _entity: &T) -> Option<EntityEvent<T>> {
        None
    }

    fn on_delete_event(&self, _entity: &T) -> Option<EntityEvent<T>> {
        None
    }
}

/// Hooks that keep every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl<T: Entity, Q> CrudHooks<T, Q> for DefaultHooks {}

/// Generic create/read/update/delete/list service.
///
/// `E` is the event type carried by the publisher. It is usually
/// `EntityEvent<T>`; an application-wide enum works too as long as it
/// converts from `EntityEvent<T>`.
pub struct CrudService<St, M, H, P, E> {
    store: St,
    mapper: M,
    hooks: H,
    publisher: P,
    _event: PhantomData<fn(E)>,
}

impl<St, M, H, P, E> CrudService<St, M, H, P, E> {
    pub fn new(store: St, mapper: M, hooks: H, publisher: P) -> Self {
        Self {
            store,
            mapper,
            hooks,
            publisher,
            _event: PhantomData,
        }
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn into_parts(self) -> (St, M, H, P) {
        (self.store, self.mapper, self.hooks, self.publisher)
    }
}

impl<St, M, H> CrudService<St, M, H, NoopPublisher, EntityEvent<M::Entity>>
where
    M: CrudMapper,
{
    /// A service whose events go nowhere.
    pub fn without_events(store: St, mapper: M, hooks: H) -> Self {
        Self::new(store, mapper, hooks, NoopPublisher)
    }
}

impl<St, M, H, P, E> CrudService<St, M, H, P, E>
where
    M: CrudMapper,
    St: EntityStore<M::Entity>,
    H: CrudHooks<M::Entity, M::Request>,
    P: EventPublisher<E>,
    E: Event + From<EntityEvent<M::Entity>>,
{
    /// Maps `request` to a new entity, persists it and returns its response DTO.
    pub fn create(&self, request: &M::Request) -> CrudResult<M::Response> {
        let mut entity = self.mapper.to_create(request);
        self.hooks.on_create(request, &mut entity);
        let created = self.create_entity(entity)?;
        Ok(self.mapper.to_response(&created))
    }

    /// Persists `entity` as is. Goes through the same event hook as [`Self::create`].
    pub fn create_entity(&self, entity: M::Entity) -> CrudResult<M::Entity> {
        self.in_transaction(|pending| {
            let created = self.store.create(entity)?;
            debug!(entity_type = <M::Entity as Entity>::TYPE_NAME, id = ?created.id(), "entity created");
            self.emit(self.hooks.on_create_event(&created), pending)?;
            Ok(created)
        })
    }

    /// Merges the request's present fields onto entity `id`.
    ///
    /// `Ok(None)` when `id` is unknown; nothing is published then.
    pub fn update(&self, id: &<M::Entity as Entity>::Id, request: &M::Request) -> CrudResult<Option<M::Response>> {
        let ignored = self.hooks.ignored_merge_fields();
        let updated = self.in_transaction(|pending| {
            let updated = self.store.update(id, request, |request, entity| {
                self.mapper.to_update(request, entity, &ignored)?;
                self.hooks.on_update(request, entity);
                Ok(())
            })?;
            self.after_update(updated, pending)
        })?;
        Ok(updated.map(|entity| self.mapper.to_response(&entity)))
    }

    /// Merges `source` onto entity `id`, honouring [`CrudHooks::ignored_merge_fields`].
    pub fn update_entity(
        &self,
        id: &<M::Entity as Entity>::Id,
        source: &M::Entity,
    ) -> CrudResult<Option<M::Entity>>
    where
        M::Entity: Merge<M::Entity>,
    {
        let ignored = self.hooks.ignored_merge_fields();
        self.in_transaction(|pending| {
            let updated = self.store.update(id, source, |source, entity| {
                merge(source, entity, &ignored)?;
                Ok(())
            })?;
            self.after_update(updated, pending)
        })
    }

    /// Deletes entity `id`. Returns whether it existed.
    pub fn delete(&self, id: &<M::Entity as Entity>::Id) -> CrudResult<bool> {
        self.in_transaction(|pending| {
            let Some(removed) = self.store.delete(id)? else {
                debug!(entity_type = <M::Entity as Entity>::TYPE_NAME, %id, "delete of unknown id");
                return Ok(false);
            };
            debug!(entity_type = <M::Entity as Entity>::TYPE_NAME, %id, "entity deleted");
            self.emit(self.hooks.on_delete_event(&removed), pending)?;
            Ok(true)
        })
    }

    pub fn get_one(&self, id: &<M::Entity as Entity>::Id) -> CrudResult<Option<M::Response>> {
        Ok(self.get_one_entity(id)?.map(|e| self.mapper.to_response(&e)))
    }

    pub fn get_one_entity(&self, id: &<M::Entity as Entity>::Id) -> CrudResult<Option<M::Entity>> {
        self.store.fetch_by_id(id)
    }

    pub fn get_all(&self) -> CrudResult<Vec<M::Response>> {
        Ok(self.respond_all(self.get_all_entities()?))
    }

    pub fn get_all_entities(&self) -> CrudResult<Vec<M::Entity>> {
        self.store.list_all()
    }

    pub fn get_page(&self, request: &PageRequest) -> CrudResult<Page<M::Response>> {
        Ok(self.get_entity_page(request)?.map(|e| self.mapper.to_response(&e)))
    }

    pub fn get_entity_page(&self, request: &PageRequest) -> CrudResult<Page<M::Entity>> {
        self.store.list_page(request)
    }

    pub fn get_sorted(&self, sort: &Sort) -> CrudResult<Vec<M::Response>> {
        Ok(self.respond_all(self.get_sorted_entities(sort)?))
    }

    pub fn get_sorted_entities(&self, sort: &Sort) -> CrudResult<Vec<M::Entity>> {
        self.store.list_sorted(sort)
    }

    fn respond_all(&self, entities: Vec<M::Entity>) -> Vec<M::Response> {
        entities.iter().map(|e| self.mapper.to_response(e)).collect()
    }

    fn after_update(
        &self,
        updated: Option<M::Entity>,
        pending: &mut PendingEvents<E>,
    ) -> CrudResult<Option<M::Entity>> {
        if let Some(entity) = &updated {
            debug!(entity_type = <M::Entity as Entity>::TYPE_NAME, id = ?entity.id(), "entity updated");
            self.emit(self.hooks.on_update_event(entity), pending)?;
        }
        Ok(updated)
    }

    fn emit(&self, event: Option<EntityEvent<M::Entity>>, pending: &mut PendingEvents<E>) -> CrudResult<()> {
        match event {
            Some(event) => self.publisher.publish(E::from(event), pending),
            None => Ok(()),
        }
    }

    /// Runs `work` in a store transaction, then delivers after-commit events
    /// on success or discards them on failure.
    fn in_transaction<R>(&self, work: impl FnOnce(&mut PendingEvents<E>) -> CrudResult<R>) -> CrudResult<R> {
        let mut pending = PendingEvents::new();
        match self.store.transaction(|| work(&mut pending)) {
            Ok(value) => {
                let report = self.publisher.deliver_committed(pending);
                if !report.is_clean() {
                    warn!(
                        entity_type = <M::Entity as Entity>::TYPE_NAME,
                        failed = report.failures.len(),
                        "after-commit delivery incomplete"
                    );
                }
                Ok(value)
            }
            Err(err) => {
                pending.rollback();
                Err(err)
            }
        }
    }
}

impl<St, M, H, P, E> std::fmt::Debug for CrudService<St, M, H, P, E>
where
    St: std::fmt::Debug,
    P: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudService")
            .field("store", &self.store)
            .field("publisher", &self.publisher)
            .finish_non_exhaustive()
    }
}
