use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crudkit_core::Entity;

/// Lifecycle variant tag. Subscriptions are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// A lifecycle notification.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - produced at most once per successful create/update/delete
/// - not persisted by the bus
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn event_id(&self) -> Uuid;

    fn kind(&self) -> EventKind;

    /// Type name of the affected entity (e.g. `"User"`).
    fn entity_type(&self) -> &'static str;

    fn occurred_at(&self) -> DateTime<Utc>;
}

/// What an event is about: the entity itself, or only its identity when the
/// entity object is no longer resident (e.g. a delete by reference).
#[derive(Debug, Clone)]
pub enum Subject<T: Entity> {
    Entity(T),
    Reference(T::Id),
}

/// Created/updated/deleted notification wrapping exactly one entity.
#[derive(Debug, Clone)]
pub struct EntityEvent<T: Entity> {
    event_id: Uuid,
    kind: EventKind,
    occurred_at: DateTime<Utc>,
    subject: Subject<T>,
}

impl<T: Entity> EntityEvent<T> {
    pub fn new(kind: EventKind, subject: Subject<T>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            kind,
            occurred_at: Utc::now(),
            subject,
        }
    }

    pub fn created(entity: T) -> Self {
        Self::new(EventKind::Created, Subject::Entity(entity))
    }

    pub fn updated(entity: T) -> Self {
        Self::new(EventKind::Updated, Subject::Entity(entity))
    }

    pub fn deleted(entity: T) -> Self {
        Self::new(EventKind::Deleted, Subject::Entity(entity))
    }

    pub fn deleted_reference(id: T::Id) -> Self {
        Self::new(EventKind::Deleted, Subject::Reference(id))
    }

    pub fn subject(&self) -> &Subject<T> {
        &self.subject
    }

    /// The wrapped entity, unless the event only carries a reference.
    pub fn entity(&self) -> Option<&T> {
        match &self.subject {
            Subject::Entity(entity) => Some(entity),
            Subject::Reference(_) => None,
        }
    }

    pub fn into_entity(self) -> Option<T> {
        match self.subject {
            Subject::Entity(entity) => Some(entity),
            Subject::Reference(_) => None,
        }
    }

    pub fn entity_id(&self) -> Option<&T::Id> {
        match &self.subject {
            Subject::Entity(entity) => entity.id(),
            Subject::Reference(id) => Some(id),
        }
    }

    /// Whether the wrapped entity's type name is `type_name`.
    pub fn concerns(&self, type_name: &str) -> bool {
        T::TYPE_NAME == type_name
    }
}

impl<T: Entity> Event for EntityEvent<T> {
    fn event_id(&self) -> Uuid {
        self.event_id
    }

    fn kind(&self) -> EventKind {
        self.kind
    }

    fn entity_type(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
