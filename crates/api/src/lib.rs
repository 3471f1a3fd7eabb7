//! Transport boundary: page serialization, naming, and axum CRUD endpoints.
//!
//! - `naming.rs`: camel-case word splitting and case conversions
//! - `pluralize.rs`: pluggable English pluralization
//! - `serializer.rs`: configurable JSON rendering of a `Page`
//! - `controller.rs`: service outcomes → HTTP responses, plus a generic router
//! - `errors.rs`: consistent error responses

pub mod controller;
pub mod errors;
pub mod naming;
pub mod pluralize;
pub mod serializer;

pub use controller::{CrudController, CrudEndpoint, ListQuery, crud_router};
pub use errors::{crud_error_to_response, json_error};
pub use pluralize::{EnglishPluralizer, Pluralizer};
pub use serializer::{ContentAliasMode, PageSerializer, PageSerializerConfig};
