//! Deferred after-commit deliveries of one transaction.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::listener::HandlerError;

pub(crate) type Delivery = Box<dyn FnOnce() -> Result<(), (String, HandlerError)> + Send>;

/// After-commit deliveries queued during one transaction.
///
/// Created by whoever opens the transaction. The bus fills it while the
/// transaction runs; the owner then either hands it back to
/// [`EventPublisher::deliver_committed`](crate::EventPublisher::deliver_committed)
/// after a successful commit, or calls [`PendingEvents::rollback`].
/// Dropping it without either discards the deliveries, same as a rollback.
pub struct PendingEvents<E> {
    events: Vec<Arc<E>>,
    deliveries: Vec<Delivery>,
}

impl<E> PendingEvents<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn defer(&mut self, event: Arc<E>, deliveries: Vec<Delivery>) {
        self.events.push(event);
        self.deliveries.extend(deliveries);
    }

    /// Events published in this transaction, in publish order.
    pub fn events(&self) -> impl Iterator<Item = &E> {
        self.events.iter().map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn take_deliveries(&mut self) -> Vec<Delivery> {
        self.events.clear();
        std::mem::take(&mut self.deliveries)
    }

    /// Runs every deferred delivery, in publish then registration order.
    ///
    /// Call only after the transaction committed. A failing listener does not
    /// stop the remaining deliveries; failures are logged and reported.
    pub fn commit(mut self) -> CommitReport {
        let mut report = CommitReport::default();
        for delivery in self.take_deliveries() {
            match delivery() {
                Ok(()) => report.delivered += 1,
                Err((listener, err)) => {
                    error!(listener = %listener, error = %err, "after-commit listener failed");
                    report.failures.push(DeliveryFailure { listener, error: err });
                }
            }
        }
        debug!(
            delivered = report.delivered,
            failed = report.failures.len(),
            "after-commit deliveries drained"
        );
        report
    }

    /// Discards all deferred deliveries.
    pub fn rollback(self) {
        if !self.deliveries.is_empty() {
            warn!(
                events = self.events.len(),
                deliveries = self.deliveries.len(),
                "transaction rolled back; discarding after-commit deliveries"
            );
        }
    }
}

impl<E> Default for PendingEvents<E> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            deliveries: Vec::new(),
        }
    }
}

impl<E> std::fmt::Debug for PendingEvents<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingEvents")
            .field("events", &self.events.len())
            .field("deliveries", &self.deliveries.len())
            .finish()
    }
}

/// An after-commit listener that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub listener: String,
    pub error: HandlerError,
}

/// Outcome of draining after-commit deliveries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub delivered: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
