use std::sync::Arc;

use crudkit_core::{CrudResult, Entity, Page, PageRequest, Sort};

/// Generic persistence for one entity type.
///
/// ## Absence
///
/// A missing ID is never an error: lookups return `Ok(None)`. Errors are
/// reserved for structural failures, version conflicts and invalid input.
///
/// ## Concurrency
///
/// `save()` must compare the entity's version token with the stored one and
/// fail with [`CrudError::ConcurrencyConflict`](crudkit_core::CrudError) on a
/// mismatch, bumping the version by one otherwise. Last-flush-wins is not
/// acceptable.
///
/// ## Transactions
///
/// [`EntityStore::transaction`] scopes a unit of work. When the closure
/// returns an error, every write it made must be undone. The default runs the
/// closure without any isolation, which suits backends whose writes are
/// individually atomic and that have nothing to roll back.
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Persists a new entity, assigning its ID (when absent) and initial version.
    fn create(&self, entity: T) -> CrudResult<T>;

    fn fetch_by_id(&self, id: &T::Id) -> CrudResult<Option<T>>;

    /// Fetch that precedes a merge+save. Backends may lock the row here.
    fn fetch_to_update(&self, id: &T::Id) -> CrudResult<Option<T>> {
        self.fetch_by_id(id)
    }

    /// Flushes a modified entity with an optimistic version check.
    fn save(&self, entity: T) -> CrudResult<T>;

    /// Fetch that precedes a remove.
    fn fetch_to_delete(&self, id: &T::Id) -> CrudResult<Option<T>> {
        self.fetch_by_id(id)
    }

    fn remove(&self, entity: &T) -> CrudResult<()>;

    /// Fetch, merge `source` onto the entity, then save it.
    ///
    /// Returns `Ok(None)` without calling `merge` when `id` is unknown.
    fn update<S, F>(&self, id: &T::Id, source: &S, merge: F) -> CrudResult<Option<T>>
    where
        S: ?Sized,
        F: FnOnce(&S, &mut T) -> CrudResult<()>,
    {
        let Some(mut entity) = self.fetch_to_update(id)? else {
            return Ok(None);
        };
        merge(source, &mut entity)?;
        self.save(entity).map(Some)
    }

    /// Removes the entity with `id` and hands back what was removed.
    fn delete(&self, id: &T::Id) -> CrudResult<Option<T>> {
        let Some(entity) = self.fetch_to_delete(id)? else {
            return Ok(None);
        };
        self.remove(&entity)?;
        Ok(Some(entity))
    }

    fn list_all(&self) -> CrudResult<Vec<T>>;

    fn list_page(&self, request: &PageRequest) -> CrudResult<Page<T>>;

    fn list_sorted(&self, sort: &Sort) -> CrudResult<Vec<T>>;

    fn transaction<R, F>(&self, work: F) -> CrudResult<R>
    where
        F: FnOnce() -> CrudResult<R>,
    {
        work()
    }
}

impl<T, S> EntityStore<T> for Arc<S>
where
    T: Entity,
    S: EntityStore<T>,
{
    fn create(&self, entity: T) -> CrudResult<T> {
        (**self).create(entity)
    }

    fn fetch_by_id(&self, id: &T::Id) -> CrudResult<Option<T>> {
        (**self).fetch_by_id(id)
    }

    fn fetch_to_update(&self, id: &T::Id) -> CrudResult<Option<T>> {
        (**self).fetch_to_update(id)
    }

    fn save(&self, entity: T) -> CrudResult<T> {
        (**self).save(entity)
    }

    fn fetch_to_delete(&self, id: &T::Id) -> CrudResult<Option<T>> {
        (**self).fetch_to_delete(id)
    }

    fn remove(&self, entity: &T) -> CrudResult<()> {
        (**self).remove(entity)
    }

    fn update<Src, F>(&self, id: &T::Id, source: &Src, merge: F) -> CrudResult<Option<T>>
    where
        Src: ?Sized,
        F: FnOnce(&Src, &mut T) -> CrudResult<()>,
    {
        (**self).update(id, source, merge)
    }

    fn delete(&self, id: &T::Id) -> CrudResult<Option<T>> {
        (**self).delete(id)
    }

    fn list_all(&self) -> CrudResult<Vec<T>> {
        (**self).list_all()
    }

    fn list_page(&self, request: &PageRequest) -> CrudResult<Page<T>> {
        (**self).list_page(request)
    }

    fn list_sorted(&self, sort: &Sort) -> CrudResult<Vec<T>> {
        (**self).list_sorted(sort)
    }

    fn transaction<R, F>(&self, work: F) -> CrudResult<R>
    where
        F: FnOnce() -> CrudResult<R>,
    {
        (**self).transaction(work)
    }
}
