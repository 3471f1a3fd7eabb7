//! Event publishing abstraction (mechanics only).
//!
//! The CRUD service is handed an [`EventPublisher`] at construction and calls
//! [`EventPublisher::publish`] inside the transaction of the operation that
//! produced the event. Whether a subscriber hears about it right away or only
//! after commit is a property of its subscription, never of the publish call.
//!
//! ## Delivery guarantees
//!
//! - **in-transaction**: synchronous, in registration order, on the caller's
//!   thread. The first failure stops dispatch and aborts the operation.
//! - **after-commit**: at most once, only if the transaction committed.
//!   Failures are reported in a [`CommitReport`], never retried.
//!
//! Events are not persisted by the bus.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use crudkit_core::CrudResult;

use crate::pending::{CommitReport, PendingEvents};

/// Channel end of an after-commit subscription.
///
/// Lets a subscriber take delivery on a thread of its choosing:
///
/// ```ignore
/// let subscription = bus.after_commit_channel("mailer", Interest::all());
/// std::thread::spawn(move || {
///     while let Ok(event) = subscription.recv() {
///         send_welcome_mail(&event);
///     }
/// });
/// ```
///
/// The sender side is dropped by the bus once the receiver is gone.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Sink for lifecycle events, supplied to the CRUD service at construction.
///
/// ## Error handling
///
/// `publish()` fails only when an in-transaction listener rejected the event.
/// The caller must then roll its transaction back and discard `pending`.
///
/// ## Thread safety
///
/// Implementations are shared across request threads (`Send + Sync`).
pub trait EventPublisher<E>: Send + Sync {
    /// Delivers `event` to in-transaction listeners now and queues it in
    /// `pending` for after-commit listeners.
    fn publish(&self, event: E, pending: &mut PendingEvents<E>) -> CrudResult<()>;

    /// Delivers queued events once the transaction committed.
    fn deliver_committed(&self, pending: PendingEvents<E>) -> CommitReport {
        pending.commit()
    }
}

impl<E, P> EventPublisher<E> for Arc<P>
where
    P: EventPublisher<E> + ?Sized,
{
    fn publish(&self, event: E, pending: &mut PendingEvents<E>) -> CrudResult<()> {
        (**self).publish(event, pending)
    }

    fn deliver_committed(&self, pending: PendingEvents<E>) -> CommitReport {
        (**self).deliver_committed(pending)
    }
}

/// Publisher that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl<E> EventPublisher<E> for NoopPublisher {
    fn publish(&self, _event: E, _pending: &mut PendingEvents<E>) -> CrudResult<()> {
        Ok(())
    }
}
