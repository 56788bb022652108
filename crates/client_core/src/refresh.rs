//! Session-scoped "data changed, reload" broadcast between sibling views.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, Weak,
};

use tracing::debug;

/// Zero-payload notification. Delivery order is the only ordering it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSignal;

type Handler = Arc<dyn Fn(RefreshSignal) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(u64, Handler)>>,
}

impl Registry {
    fn handlers(&self) -> MutexGuard<'_, Vec<(u64, Handler)>> {
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Publish/subscribe channel with no buffering and no replay.
///
/// Every `notify` reaches each handler registered at that moment exactly
/// once, synchronously and in subscription order. Handlers registered later
/// never see earlier signals.
#[derive(Clone, Default)]
pub struct RefreshBus {
    registry: Arc<Registry>,
}

impl RefreshBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(RefreshSignal) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.handlers().push((id, Arc::new(handler)));
        debug!(subscription = id, "refresh bus: subscribed");
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn notify(&self) {
        // Snapshot so handlers may subscribe, unsubscribe or notify re-entrantly.
        let handlers: Vec<Handler> = self
            .registry
            .handlers()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        debug!(subscribers = handlers.len(), "refresh bus: notify");
        for handler in handlers {
            handler(RefreshSignal);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.handlers().len()
    }
}

/// Registration handle; the handler is removed when this is dropped.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.handlers().retain(|(id, _)| *id != self.id);
            debug!(subscription = self.id, "refresh bus: unsubscribed");
        }
    }
}

#[cfg(test)]
#[path = "tests/refresh_tests.rs"]
mod tests;
