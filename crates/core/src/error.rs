//! CRUD error model.
//!
//! Absence is not an error: lookups, updates and deletes on a missing ID
//! return `None`/`false`. Everything here is a failure that aborts the
//! current operation and is surfaced to the caller unchanged.

use thiserror::Error;

/// Result type used across the CRUD layers.
pub type CrudResult<T> = Result<T, CrudError>;

/// A field could not be copied from a merge source onto its target.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("could not copy field '{field}': {reason}")]
pub struct MergeError {
    pub field: String,
    pub reason: String,
}

impl MergeError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CrudError {
    /// Partial merge failed structurally. Not retried.
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    /// The version token changed between fetch and flush.
    ///
    /// Callers may retry the whole read-merge-write cycle.
    #[error(
        "concurrent modification of {entity_type} {id} (expected version {expected}, found {actual})"
    )]
    ConcurrencyConflict {
        entity_type: &'static str,
        id: String,
        expected: u64,
        actual: u64,
    },

    /// Create was asked to persist an entity whose ID is already taken.
    #[error("{entity_type} {id} already exists")]
    AlreadyExists { entity_type: &'static str, id: String },

    /// An in-transaction listener rejected the operation; the transaction was rolled back.
    #[error("vetoed by listener '{listener}': {reason}")]
    Vetoed { listener: String, reason: String },

    /// A sort clause referenced a property the entity does not have.
    #[error("invalid sort: {0}")]
    InvalidSort(String),

    /// Malformed input (e.g. unparsable identifier).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Structural storage failure (I/O, poisoned state, ...).
    #[error("store failure: {0}")]
    Store(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl CrudError {
    pub fn conflict(entity_type: &'static str, id: impl ToString, expected: u64, actual: u64) -> Self {
        Self::ConcurrencyConflict {
            entity_type,
            id: id.to_string(),
            expected,
            actual,
        }
    }

    pub fn already_exists(entity_type: &'static str, id: impl ToString) -> Self {
        Self::AlreadyExists {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn vetoed(listener: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Vetoed {
            listener: listener.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_sort(msg: impl Into<String>) -> Self {
        Self::InvalidSort(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether retrying the full read-merge-write cycle may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

impl From<serde_json::Error> for CrudError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
