use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Condvar, Mutex, PoisonError, RwLock};
use std::thread::{self, ThreadId};

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crudkit_core::{CrudError, CrudResult, Entity, ExpectedVersion, GenerateId, Page, PageRequest, Sort};

use super::r#trait::EntityStore;

/// Attempts at drawing a free ID before giving up.
const MAX_ID_ATTEMPTS: usize = 64;

#[derive(Debug, Clone)]
struct Row<T> {
    /// Insertion position; listing order when unsorted.
    position: u64,
    entity: T,
}

/// Undo log of the open transaction: the state each touched row had before
/// its first write, keyed by ID (`None` for rows the transaction created).
#[derive(Debug)]
struct Journal<T: Entity> {
    owner: ThreadId,
    next_position: u64,
    prior: HashMap<T::Id, Option<Row<T>>>,
}

#[derive(Debug)]
struct Table<T: Entity> {
    rows: HashMap<T::Id, Row<T>>,
    next_position: u64,
    journal: Option<Journal<T>>,
}

impl<T: Entity> Table<T> {
    fn ordered(&self) -> Vec<T> {
        let mut rows: Vec<&Row<T>> = self.rows.values().collect();
        rows.sort_by_key(|r| r.position);
        rows.into_iter().map(|r| r.entity.clone()).collect()
    }

    /// Records the current state of `id` before the transaction on this
    /// thread first writes it. Writes from other threads are not journaled.
    fn remember(&mut self, id: &T::Id) {
        let Some(journal) = self.journal.as_mut() else {
            return;
        };
        if journal.owner != thread::current().id() {
            return;
        }
        journal
            .prior
            .entry(id.clone())
            .or_insert_with(|| self.rows.get(id).cloned());
    }

    fn undo(&mut self, journal: Journal<T>) {
        for (id, prior) in journal.prior {
            match prior {
                Some(row) => {
                    self.rows.insert(id, row);
                }
                None => {
                    self.rows.remove(&id);
                }
            }
        }
        self.next_position = journal.next_position;
    }
}

/// Thread currently running a transaction on the store, and how deeply
/// nested its `transaction` calls are.
#[derive(Debug, Default)]
struct TxOwner {
    thread: Option<ThreadId>,
    depth: usize,
}

/// Held for the duration of one `transaction` call.
struct TxGuard<'a> {
    owner: &'a Mutex<TxOwner>,
    released: &'a Condvar,
    outermost: bool,
}

impl Drop for TxGuard<'_> {
    fn drop(&mut self) {
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        owner.depth = owner.depth.saturating_sub(1);
        if owner.depth == 0 {
            owner.thread = None;
            self.released.notify_one();
        }
    }
}

/// In-memory entity store.
///
/// Intended for tests/dev. Not optimized for performance.
///
/// - IDs are drawn from a per-store sequence via [`GenerateId`]
/// - Versions start at 0 and are bumped on every successful save
/// - Transactions are serialized across threads. A nested `transaction` call
///   on the owning thread joins the open one, and only the outermost call
///   commits or rolls back
/// - Rollback replays an undo log of the rows the transaction touched
/// - Sorting goes through the entity's serde representation, so sort
///   properties are serialized field names
#[derive(Debug)]
pub struct InMemoryEntityStore<T: Entity> {
    table: RwLock<Table<T>>,
    sequence: AtomicU64,
    tx_owner: Mutex<TxOwner>,
    tx_released: Condvar,
}

impl<T: Entity> InMemoryEntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.read().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> CrudResult<std::sync::RwLockReadGuard<'_, Table<T>>> {
        self.table.read().map_err(|_| CrudError::store("lock poisoned"))
    }

    fn write(&self) -> CrudResult<std::sync::RwLockWriteGuard<'_, Table<T>>> {
        self.table.write().map_err(|_| CrudError::store("lock poisoned"))
    }

    /// Enters a transaction, waiting while another thread owns one.
    fn enter(&self) -> CrudResult<TxGuard<'_>> {
        let me = thread::current().id();
        let mut owner = self
            .tx_owner
            .lock()
            .map_err(|_| CrudError::store("transaction lock poisoned"))?;
        loop {
            match owner.thread {
                Some(holder) if holder == me => {
                    owner.depth += 1;
                    return Ok(self.guard(false));
                }
                Some(_) => {
                    owner = self
                        .tx_released
                        .wait(owner)
                        .map_err(|_| CrudError::store("transaction lock poisoned"))?;
                }
                None => {
                    owner.thread = Some(me);
                    owner.depth = 1;
                    return Ok(self.guard(true));
                }
            }
        }
    }

    fn guard(&self, outermost: bool) -> TxGuard<'_> {
        TxGuard {
            owner: &self.tx_owner,
            released: &self.tx_released,
            outermost,
        }
    }
}

impl<T: Entity> Default for InMemoryEntityStore<T> {
    fn default() -> Self {
        Self {
            table: RwLock::new(Table {
                rows: HashMap::new(),
                next_position: 0,
                journal: None,
            }),
            sequence: AtomicU64::new(0),
            tx_owner: Mutex::new(TxOwner::default()),
            tx_released: Condvar::new(),
        }
    }
}

impl<T> EntityStore<T> for InMemoryEntityStore<T>
where
    T: Entity + Serialize,
    T::Id: GenerateId,
{
    fn create(&self, mut entity: T) -> CrudResult<T> {
        let mut table = self.write()?;

        let id = match entity.id() {
            Some(id) if table.rows.contains_key(id) => {
                return Err(CrudError::already_exists(T::TYPE_NAME, id));
            }
            Some(id) => id.clone(),
            None => {
                let mut attempts = 0;
                loop {
                    let candidate = T::Id::generate(self.sequence.fetch_add(1, AtomicOrdering::Relaxed) + 1);
                    if !table.rows.contains_key(&candidate) {
                        break candidate;
                    }
                    attempts += 1;
                    if attempts >= MAX_ID_ATTEMPTS {
                        return Err(CrudError::store(format!("no free {} id", T::TYPE_NAME)));
                    }
                }
            }
        };

        entity.set_id(id.clone());
        entity.set_version(0);

        table.remember(&id);
        let position = table.next_position;
        table.next_position += 1;
        table.rows.insert(
            id.clone(),
            Row {
                position,
                entity: entity.clone(),
            },
        );
        debug!(entity_type = T::TYPE_NAME, %id, "created");
        Ok(entity)
    }

    fn fetch_by_id(&self, id: &T::Id) -> CrudResult<Option<T>> {
        let table = self.read()?;
        Ok(table.rows.get(id).map(|r| r.entity.clone()))
    }

    fn save(&self, mut entity: T) -> CrudResult<T> {
        let Some(id) = entity.id().cloned() else {
            return Err(CrudError::validation(format!(
                "cannot save a {} without an id",
                T::TYPE_NAME
            )));
        };

        let mut table = self.write()?;
        table.remember(&id);
        let Some(row) = table.rows.get_mut(&id) else {
            return Err(CrudError::store(format!("{} {id} is not persisted", T::TYPE_NAME)));
        };

        let stored = row.entity.version().unwrap_or(0);
        ExpectedVersion::of(entity.version()).check(T::TYPE_NAME, &id, stored)?;
        if entity.version().is_some() {
            entity.set_version(stored + 1);
        }

        row.entity = entity.clone();
        debug!(entity_type = T::TYPE_NAME, %id, version = ?entity.version(), "saved");
        Ok(entity)
    }

    fn remove(&self, entity: &T) -> CrudResult<()> {
        let Some(id) = entity.id() else {
            return Ok(());
        };
        let mut table = self.write()?;
        table.remember(id);
        if table.rows.remove(id).is_some() {
            debug!(entity_type = T::TYPE_NAME, %id, "removed");
        }
        Ok(())
    }

    fn list_all(&self) -> CrudResult<Vec<T>> {
        Ok(self.read()?.ordered())
    }

    fn list_page(&self, request: &PageRequest) -> CrudResult<Page<T>> {
        let all = self.list_sorted(request.sort())?;
        let total = all.len() as u64;
        let content = all
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(request.size()).unwrap_or(usize::MAX))
            .collect();
        Ok(Page::new(content, request, total))
    }

    fn list_sorted(&self, sort: &Sort) -> CrudResult<Vec<T>> {
        let entities = self.list_all()?;
        if !sort.is_sorted() {
            return Ok(entities);
        }
        sort_entities(entities, sort)
    }

    fn transaction<R, F>(&self, work: F) -> CrudResult<R>
    where
        F: FnOnce() -> CrudResult<R>,
    {
        let guard = self.enter()?;
        if !guard.outermost {
            return work();
        }

        {
            let mut table = self.write()?;
            let next_position = table.next_position;
            table.journal = Some(Journal {
                owner: thread::current().id(),
                next_position,
                prior: HashMap::new(),
            });
        }

        let result = work();

        let mut table = self.write()?;
        let journal = table.journal.take();
        if let Err(err) = &result {
            warn!(entity_type = T::TYPE_NAME, error = %err, "rolling back transaction");
            if let Some(journal) = journal {
                table.undo(journal);
            }
        }
        result
    }
}

fn sort_entities<T: Serialize>(entities: Vec<T>, sort: &Sort) -> CrudResult<Vec<T>> {
    let mut keyed = entities
        .into_iter()
        .map(|e| Ok((serde_json::to_value(&e)?, e)))
        .collect::<CrudResult<Vec<_>>>()?;

    for order in sort {
        let known = keyed.is_empty() || keyed.iter().any(|(json, _)| property(json, &order.property).is_some());
        if !known {
            return Err(CrudError::invalid_sort(format!("unknown property '{}'", order.property)));
        }
    }

    keyed.sort_by(|(a, _), (b, _)| {
        sort.iter()
            .map(|order| {
                let ord = compare_json(property(a, &order.property), property(b, &order.property));
                if order.direction.is_ascending() { ord } else { ord.reverse() }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    Ok(keyed.into_iter().map(|(_, e)| e).collect())
}

/// Looks `name` up as given, then in its snake_case form (`createdAt` -> `created_at`).
fn property<'a>(json: &'a JsonValue, name: &str) -> Option<&'a JsonValue> {
    json.get(name).or_else(|| json.get(to_snake(name)))
}

fn to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_uppercase() {
            out.push('_');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn rank(value: Option<&JsonValue>) -> u8 {
    match value {
        None | Some(JsonValue::Null) => 0,
        Some(JsonValue::Bool(_)) => 1,
        Some(JsonValue::Number(_)) => 2,
        Some(JsonValue::String(_)) => 3,
        Some(JsonValue::Array(_)) => 4,
        Some(JsonValue::Object(_)) => 5,
    }
}

/// Total order over JSON scalars; nulls first.
fn compare_json(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    match (a, b) {
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
            }
        }
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
