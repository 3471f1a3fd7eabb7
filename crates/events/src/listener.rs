//! Subscriber declarations: when a listener runs and which events it wants.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::event::{Event, EventKind};

/// Delivery timing of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timing {
    /// Synchronously, before the triggering transaction commits. May veto it.
    InTransaction,
    /// Once the triggering transaction has committed. Skipped on rollback.
    AfterCommit,
}

/// Failure returned by a listener.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Business rule refusal (e.g. "user 1 may not be deleted").
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("failed: {0}")]
    Failed(String),
}

impl HandlerError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Rejected(r) | Self::Failed(r) => r,
        }
    }
}

pub type HandlerResult = Result<(), HandlerError>;

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Which events a listener is interested in.
///
/// All set criteria must hold: variant tag, entity type, then the optional
/// predicate over the event itself.
pub struct Interest<E> {
    kind: Option<EventKind>,
    entity_type: Option<&'static str>,
    predicate: Option<Predicate<E>>,
}

impl<E: Event> Interest<E> {
    /// Every event on the bus.
    pub fn all() -> Self {
        Self {
            kind: None,
            entity_type: None,
            predicate: None,
        }
    }

    /// Only events of one variant.
    pub fn kind(kind: EventKind) -> Self {
        Self::all().of_kind(kind)
    }

    pub fn of_kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Only events about entities of type `entity_type`.
    pub fn entity(mut self, entity_type: &'static str) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn when(mut self, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn matches(&self, event: &E) -> bool {
        if self.kind.is_some_and(|k| k != event.kind()) {
            return false;
        }
        if self.entity_type.is_some_and(|t| t != event.entity_type()) {
            return false;
        }
        self.predicate.as_ref().is_none_or(|p| p(event))
    }
}

impl<E> Clone for Interest<E> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            entity_type: self.entity_type,
            predicate: self.predicate.clone(),
        }
    }
}

impl<E> fmt::Debug for Interest<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interest")
            .field("kind", &self.kind)
            .field("entity_type", &self.entity_type)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}
