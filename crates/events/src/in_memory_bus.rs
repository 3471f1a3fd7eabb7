//! In-process event bus with in-transaction and after-commit channels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, mpsc};

use tracing::debug;

use crudkit_core::{CrudError, CrudResult};

use crate::bus::{EventPublisher, Subscription};
use crate::event::Event;
use crate::listener::{HandlerError, HandlerResult, Interest, Timing};
use crate::pending::{Delivery, PendingEvents};

type Handler<E> = Arc<dyn Fn(&E) -> HandlerResult + Send + Sync>;

enum Sink<E> {
    Handler(Handler<E>),
    Channel {
        sender: mpsc::Sender<E>,
        closed: Arc<AtomicBool>,
    },
}

struct Listener<E> {
    name: String,
    interest: Interest<E>,
    sink: Sink<E>,
}

impl<E: Event> Listener<E> {
    fn is_closed(&self) -> bool {
        match &self.sink {
            Sink::Handler(_) => false,
            Sink::Channel { closed, .. } => closed.load(Ordering::Relaxed),
        }
    }

    fn deliver(&self, event: &E) -> HandlerResult {
        match &self.sink {
            Sink::Handler(handler) => handler(event),
            Sink::Channel { sender, closed } => {
                // Receiver gone: stop routing to it, nothing to report.
                if sender.send(event.clone()).is_err() {
                    closed.store(true, Ordering::Relaxed);
                }
                Ok(())
            }
        }
    }
}

/// Synchronous in-process bus.
///
/// - No IO / no async
/// - In-transaction listeners run in registration order; the first failure
///   vetoes the publish
/// - After-commit listeners are queued in the caller's [`PendingEvents`]
///
/// Listener lists are snapshotted per publish, so a listener may register
/// further listeners without deadlocking; those apply from the next publish.
pub struct InMemoryEventBus<E> {
    in_transaction: RwLock<Vec<Arc<Listener<E>>>>,
    after_commit: RwLock<Vec<Arc<Listener<E>>>>,
}

impl<E: Event> InMemoryEventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener invoked before commit. Returning an error vetoes
    /// the operation.
    pub fn on_in_transaction(
        &self,
        name: impl Into<String>,
        interest: Interest<E>,
        handler: impl Fn(&E) -> HandlerResult + Send + Sync + 'static,
    ) {
        self.register(Timing::InTransaction, name.into(), interest, Sink::Handler(Arc::new(handler)));
    }

    /// Registers a listener invoked once the transaction committed, on the
    /// committing thread.
    pub fn on_after_commit(
        &self,
        name: impl Into<String>,
        interest: Interest<E>,
        handler: impl Fn(&E) -> HandlerResult + Send + Sync + 'static,
    ) {
        self.register(Timing::AfterCommit, name.into(), interest, Sink::Handler(Arc::new(handler)));
    }

    /// Registers an after-commit subscriber that takes delivery on a channel.
    pub fn after_commit_channel(&self, name: impl Into<String>, interest: Interest<E>) -> Subscription<E> {
        let (sender, receiver) = mpsc::channel();
        let sink = Sink::Channel {
            sender,
            closed: Arc::new(AtomicBool::new(false)),
        };
        self.register(Timing::AfterCommit, name.into(), interest, sink);
        Subscription::new(receiver)
    }

    /// Number of live listeners registered with `timing`.
    pub fn listener_count(&self, timing: Timing) -> usize {
        self.list(timing)
            .read()
            .map(|l| l.iter().filter(|x| !x.is_closed()).count())
            .unwrap_or(0)
    }

    fn list(&self, timing: Timing) -> &RwLock<Vec<Arc<Listener<E>>>> {
        match timing {
            Timing::InTransaction => &self.in_transaction,
            Timing::AfterCommit => &self.after_commit,
        }
    }

    fn register(&self, timing: Timing, name: String, interest: Interest<E>, sink: Sink<E>) {
        debug!(listener = %name, ?timing, ?interest, "registering listener");
        // Dispatch never runs under this lock, so a poisoned list is still consistent.
        let mut list = self
            .list(timing)
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        list.push(Arc::new(Listener { name, interest, sink }));
    }

    fn matching(&self, timing: Timing, event: &E) -> CrudResult<Vec<Arc<Listener<E>>>> {
        let mut list = self
            .list(timing)
            .write()
            .map_err(|_| CrudError::store("event bus listener list poisoned"))?;
        list.retain(|l| !l.is_closed());
        Ok(list.iter().filter(|l| l.interest.matches(event)).cloned().collect())
    }
}

impl<E: Event> Default for InMemoryEventBus<E> {
    fn default() -> Self {
        Self {
            in_transaction: RwLock::new(Vec::new()),
            after_commit: RwLock::new(Vec::new()),
        }
    }
}

impl<E: Event> std::fmt::Debug for InMemoryEventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventBus")
            .field("in_transaction", &self.listener_count(Timing::InTransaction))
            .field("after_commit", &self.listener_count(Timing::AfterCommit))
            .finish()
    }
}

impl<E: Event> EventPublisher<E> for InMemoryEventBus<E> {
    fn publish(&self, event: E, pending: &mut PendingEvents<E>) -> CrudResult<()> {
        let kind = event.kind();
        let entity_type = event.entity_type();

        let in_transaction = self.matching(Timing::InTransaction, &event)?;
        debug!(?kind, entity_type, listeners = in_transaction.len(), "dispatching in-transaction");
        for listener in &in_transaction {
            listener.deliver(&event).map_err(|err| {
                debug!(listener = %listener.name, error = %err, "in-transaction listener vetoed");
                CrudError::vetoed(listener.name.clone(), err.reason())
            })?;
        }

        let after_commit = self.matching(Timing::AfterCommit, &event)?;
        let event = Arc::new(event);
        let deliveries = after_commit
            .into_iter()
            .map(|listener| {
                let event = Arc::clone(&event);
                Box::new(move || {
                    listener
                        .deliver(&event)
                        .map_err(|err: HandlerError| (listener.name.clone(), err))
                }) as Delivery
            })
            .collect();
        pending.defer(event, deliveries);
        Ok(())
    }
}
