//! Entity persistence boundary.
//!
//! The CRUD service only needs fetch-by-id, list (whole, paged or sorted),
//! save and remove, plus a transaction scope. Backends decide how those map
//! onto storage.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEntityStore;
pub use r#trait::EntityStore;
