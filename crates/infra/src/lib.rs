//! Infrastructure layer: entity stores, DTO mapping and the CRUD service.

pub mod mapper;
pub mod service;
pub mod store;

mod integration_tests;

pub use mapper::CrudMapper;
pub use service::{CrudHooks, CrudService, DefaultHooks};
pub use store::{EntityStore, InMemoryEntityStore};
