//! `crudkit-core`: building blocks shared by every CRUD layer.
//!
//! This crate contains the entity/identity model, partial merge, paging and
//! sorting types, and the error model. It has no infrastructure concerns.

pub mod dto;
pub mod entity;
pub mod error;
pub mod id;
pub mod merge;
pub mod page;
pub mod sort;
pub mod version;

pub use dto::{ContentAlias, CrudRequest, CrudResponse};
pub use entity::Entity;
pub use error::{CrudError, CrudResult, MergeError};
pub use id::GenerateId;
pub use merge::{merge, IgnoredFields, Merge, MergeSlot, MergeSource};
pub use page::{Page, PageRequest};
pub use sort::{Direction, Order, Sort};
pub use version::ExpectedVersion;

#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use uuid::Uuid;
}
