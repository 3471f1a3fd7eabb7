//! Entity lifecycle events and their delivery.
//!
//! Events are published synchronously by the CRUD service once a store
//! operation succeeded, inside the same transaction. Listeners subscribe on
//! one of two channels:
//!
//! - **in-transaction**: invoked immediately, in registration order, on the
//!   caller's thread. A failing listener vetoes the operation and the
//!   transaction is rolled back.
//! - **after-commit**: queued in [`PendingEvents`] and delivered only once the
//!   transaction committed. Failures there are reported, never retried.

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod listener;
pub mod pending;

pub use bus::{EventPublisher, NoopPublisher, Subscription};
pub use event::{EntityEvent, Event, EventKind, Subject};
pub use in_memory_bus::InMemoryEventBus;
pub use listener::{HandlerError, HandlerResult, Interest, Timing};
pub use pending::{CommitReport, DeliveryFailure, PendingEvents};
