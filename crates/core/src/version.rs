//! Optimistic concurrency expectations for versioned entities.

use crate::error::{CrudError, CrudResult};

/// What a flush expects the stored version to be.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (unversioned entities).
    Any,
    /// Require the stored entity to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Expectation carried by an entity fetched for update.
    pub fn of(version: Option<u64>) -> Self {
        match version {
            Some(v) => Self::Exact(v),
            None => Self::Any,
        }
    }

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    /// Fails with [`CrudError::ConcurrencyConflict`] when `actual` does not match.
    pub fn check(self, entity_type: &'static str, id: impl ToString, actual: u64) -> CrudResult<()> {
        match self {
            ExpectedVersion::Exact(expected) if expected != actual => {
                Err(CrudError::conflict(entity_type, id, expected, actual))
            }
            _ => Ok(()),
        }
    }
}
