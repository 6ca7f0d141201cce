//! Process-wide registry of execution contexts.

use super::{ContextKey, ExecutionContext};
use crate::config::BusConfig;
use crate::events::{BusState, StepEventBus, StepListener};
use crate::utils::{Clock, SystemClock};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

static GLOBAL_REGISTRY: OnceLock<ContextRegistry> = OnceLock::new();

/// Hands out one [`ExecutionContext`] per key.
///
/// `resolve` and `release` only hold a shard lock for the insert or remove
/// itself; the returned context is then driven by its owning thread alone.
/// Contexts live until `release` is called, so a runner must release its key
/// when it shuts down.
pub struct ContextRegistry {
    contexts: DashMap<ContextKey, Arc<ExecutionContext>>,
    listeners: RwLock<Vec<Arc<dyn StepListener>>>,
    clock: Arc<dyn Clock>,
    config: BusConfig,
}

impl std::fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRegistry")
            .field("contexts", &self.contexts.len())
            .field("listeners", &self.listeners.read().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            contexts: DashMap::new(),
            listeners: RwLock::new(Vec::new()),
            clock: Arc::new(SystemClock),
            config: BusConfig::default(),
        }
    }

    /// The shared process-wide registry.
    pub fn global() -> &'static Self {
        GLOBAL_REGISTRY.get_or_init(Self::new)
    }

    /// Sets the clock given to new contexts.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the bus configuration given to new contexts.
    #[must_use]
    pub fn with_config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a listener installed on every context created afterwards.
    pub fn register_listener(&self, listener: Arc<dyn StepListener>) {
        self.listeners.write().push(listener);
    }

    /// Returns the context for `key`, creating it on first use.
    pub fn resolve(&self, key: &ContextKey) -> Arc<ExecutionContext> {
        if let Some(existing) = self.contexts.get(key) {
            return Arc::clone(existing.value());
        }

        let entry = self
            .contexts
            .entry(key.clone())
            .or_insert_with(|| Arc::new(self.create_context(key)));
        Arc::clone(entry.value())
    }

    /// Returns the context of the calling thread, creating it on first use.
    pub fn resolve_current_thread(&self) -> Arc<ExecutionContext> {
        self.resolve(&ContextKey::current_thread())
    }

    /// Removes the context for `key`. Unknown or already-released keys are a
    /// no-op. Returns true if a context was removed.
    pub fn release(&self, key: &ContextKey) -> bool {
        let Some((_, context)) = self.contexts.remove(key) else {
            debug!(context = %key, "Release of unknown context ignored");
            return false;
        };

        // The owner may still hold the bus guard; never block on it here.
        match context.try_bus() {
            Some(bus) if bus.state() == BusState::TestRunning => {
                warn!(
                    context = %key,
                    test = bus.current_outcome().map(|o| o.name()),
                    "Context released while a test was still running; its outcome is discarded"
                );
            }
            Some(_) => debug!(context = %key, "Context released"),
            None => debug!(context = %key, "Context released while its bus was in use"),
        }
        true
    }

    /// Returns the context for `key` without creating it.
    #[must_use]
    pub fn get(&self, key: &ContextKey) -> Option<Arc<ExecutionContext>> {
        self.contexts.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns true if a context exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &ContextKey) -> bool {
        self.contexts.contains_key(key)
    }

    /// The keys of all live contexts.
    #[must_use]
    pub fn keys(&self) -> Vec<ContextKey> {
        self.contexts.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of live contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Returns true if no context is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    fn create_context(&self, key: &ContextKey) -> ExecutionContext {
        let mut bus = StepEventBus::new(key.to_string())
            .with_clock(Arc::clone(&self.clock))
            .with_config(self.config.clone());
        for listener in self.listeners.read().iter() {
            bus.register_listener(Arc::clone(listener));
        }
        debug!(context = %key, listeners = bus.listener_count(), "Context created");
        ExecutionContext::new(key.clone(), bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingListener;

    #[test]
    fn test_resolve_is_idempotent() {
        let registry = ContextRegistry::new();
        let key = ContextKey::named("suite-a");

        let first = registry.resolve(&key);
        let second = registry.resolve(&key);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_keys_get_distinct_contexts() {
        let registry = ContextRegistry::new();
        let a = registry.resolve(&ContextKey::named("a"));
        let b = registry.resolve(&ContextKey::named("b"));

        assert!(!Arc::ptr_eq(&a, &b));
        a.with_bus(|bus| bus.test_started("only-in-a", Vec::new()))
            .unwrap();
        assert_eq!(b.bus().state(), BusState::Idle);
    }

    #[test]
    fn test_release_is_idempotent() {
        let registry = ContextRegistry::new();
        let key = ContextKey::named("k");
        registry.resolve(&key);

        assert!(registry.release(&key));
        assert!(!registry.release(&key));
        assert!(!registry.release(&ContextKey::named("never-seen")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_with_running_test() {
        let registry = ContextRegistry::new();
        let key = ContextKey::named("k");
        registry
            .resolve(&key)
            .with_bus(|bus| bus.test_started("abandoned", Vec::new()))
            .unwrap();

        assert!(registry.release(&key));
        // A fresh context is created after release.
        assert_eq!(registry.resolve(&key).bus().state(), BusState::Idle);
    }

    #[test]
    fn test_registered_listeners_reach_new_contexts() {
        let registry = ContextRegistry::new();
        let listener = CollectingListener::shared();
        registry.register_listener(listener.clone());

        let context = registry.resolve(&ContextKey::named("k"));
        context.with_bus(|bus| {
            bus.test_started("t", Vec::new()).unwrap();
            bus.test_finished().unwrap();
        });

        assert_eq!(listener.outcomes().len(), 1);
    }

    #[test]
    fn test_keys_and_contains() {
        let registry = ContextRegistry::new();
        registry.resolve(&ContextKey::named("x"));
        registry.resolve(&ContextKey::named("y"));

        let mut keys = registry.keys();
        keys.sort();
        assert_eq!(keys, vec![ContextKey::named("x"), ContextKey::named("y")]);
        assert!(registry.contains(&ContextKey::named("x")));
        assert!(registry.get(&ContextKey::named("z")).is_none());
    }

    #[test]
    fn test_global_registry_is_shared() {
        let key = ContextKey::new();
        let first = ContextRegistry::global().resolve(&key);
        let second = ContextRegistry::global().resolve(&key);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(ContextRegistry::global().release(&key));
    }

    #[test]
    fn test_release_while_owner_holds_the_bus() {
        let registry = ContextRegistry::new();
        let key = ContextKey::named("busy");
        let context = registry.resolve(&key);

        let mut bus = context.bus();
        bus.test_started("still running", Vec::new()).unwrap();
        assert!(registry.release(&key));
        assert!(!registry.contains(&key));
        drop(bus);

        assert!(context.try_bus().is_some());
    }
}
