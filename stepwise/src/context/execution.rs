//! One isolated execution scope.

use super::ContextKey;
use crate::events::StepEventBus;
use crate::utils::{now_utc, Timestamp};
use parking_lot::{Mutex, MutexGuard};

/// An execution context: one event bus, its in-flight outcome and its
/// open-step stack, bound to one concurrently running suite.
///
/// A context has a single writer, the thread that owns its key. The mutex
/// only satisfies the borrow checker for the shared handle and is never
/// contended in correct use.
#[derive(Debug)]
pub struct ExecutionContext {
    key: ContextKey,
    created_at: Timestamp,
    bus: Mutex<StepEventBus>,
}

impl ExecutionContext {
    /// Creates a context around a bus.
    #[must_use]
    pub fn new(key: ContextKey, bus: StepEventBus) -> Self {
        Self {
            key,
            created_at: now_utc(),
            bus: Mutex::new(bus),
        }
    }

    /// The key this context was resolved under.
    #[must_use]
    pub fn key(&self) -> &ContextKey {
        &self.key
    }

    /// When the context was created.
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Locks the bus for the owning thread.
    pub fn bus(&self) -> MutexGuard<'_, StepEventBus> {
        self.bus.lock()
    }

    /// Locks the bus unless someone already holds it.
    pub fn try_bus(&self) -> Option<MutexGuard<'_, StepEventBus>> {
        self.bus.try_lock()
    }

    /// Runs `f` against the bus.
    pub fn with_bus<R>(&self, f: impl FnOnce(&mut StepEventBus) -> R) -> R {
        f(&mut self.bus.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BusState;

    #[test]
    fn test_with_bus() {
        let context = ExecutionContext::new(ContextKey::named("k"), StepEventBus::new("k"));
        context.with_bus(|bus| bus.test_started("t", Vec::new())).unwrap();
        assert_eq!(context.bus().state(), BusState::TestRunning);
        assert_eq!(context.key().as_str(), "k");
    }
}
