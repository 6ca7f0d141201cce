//! Listener trait and implementations.

use super::LifecycleEvent;
use crate::core::{FailureCause, Tag, TestOutcome, TestResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, Level};

/// Receives lifecycle notifications from an event bus.
///
/// Every callback has a no-op default, so implementors only override what they
/// need. `on_event` sees every notification before its typed callback.
///
/// Callbacks run synchronously on the thread that delivered the inbound event.
/// Errors and panics are caught at the dispatch boundary and never reach the
/// test runner or other listeners. Listeners that need asynchronous work must
/// hand it off internally.
pub trait StepListener: Send + Sync {
    /// Name used when reporting failures of this listener.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called with every notification, before the typed callback.
    fn on_event(&self, _event: &LifecycleEvent) -> anyhow::Result<()> {
        Ok(())
    }

    /// A suite began.
    fn test_suite_started(&self, _suite_id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// A test began.
    fn test_started(&self, _name: &str, _tags: &[Tag]) -> anyhow::Result<()> {
        Ok(())
    }

    /// A step began.
    fn step_started(&self, _description: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// A step that will not execute began.
    fn skipped_step_started(&self, _description: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// The current step finished.
    fn step_finished(&self, _description: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// The current step failed.
    fn step_failed(&self, _description: &str, _cause: &FailureCause) -> anyhow::Result<()> {
        Ok(())
    }

    /// The current step was ignored.
    fn step_ignored(&self, _description: &str, _reason: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// The current step is pending.
    fn step_pending(&self, _description: &str, _reason: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// A data-driven example row began.
    fn example_started(&self, _parameters: &BTreeMap<String, String>) -> anyhow::Result<()> {
        Ok(())
    }

    /// The current example row finished.
    fn example_finished(&self, _description: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// A screenshot was attached to the current step.
    fn screenshot_taken(&self, _reference: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// The test failed outside any step.
    fn test_failed(&self, _name: &str, _cause: &FailureCause) -> anyhow::Result<()> {
        Ok(())
    }

    /// The test was annotated as ignored, pending or skipped.
    fn test_annotated(&self, _name: &str, _result: TestResult) -> anyhow::Result<()> {
        Ok(())
    }

    /// The test finished. `outcome_ready` follows.
    fn test_finished(&self, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// The fully aggregated outcome of a finished test. Called once per test.
    fn outcome_ready(&self, _outcome: &TestOutcome) -> anyhow::Result<()> {
        Ok(())
    }

    /// The suite finished. No outcomes follow until the next suite starts.
    fn test_suite_finished(&self, _suite_id: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A listener that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpListener;

impl StepListener for NoOpListener {
    fn name(&self) -> &str {
        "noop"
    }
}

/// A listener that logs notifications using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingListener {
    level: Level,
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingListener {
    /// Creates a logging listener with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging listener.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging listener.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl StepListener for LoggingListener {
    fn name(&self) -> &str {
        "logging"
    }

    fn on_event(&self, event: &LifecycleEvent) -> anyhow::Result<()> {
        if self.level == Level::DEBUG {
            debug!(event_type = event.name(), event_data = ?event, "Event: {}", event.name());
        } else {
            info!(event_type = event.name(), event_data = ?event, "Event: {}", event.name());
        }
        Ok(())
    }

    fn outcome_ready(&self, outcome: &TestOutcome) -> anyhow::Result<()> {
        info!(
            test = outcome.name(),
            result = %outcome.result(),
            steps = outcome.step_count(),
            duration_ms = outcome.duration_ms(),
            "Outcome ready"
        );
        Ok(())
    }
}

/// A listener that records every notification and outcome in memory.
#[derive(Debug, Default)]
pub struct CollectingListener {
    events: RwLock<Vec<LifecycleEvent>>,
    outcomes: RwLock<Vec<TestOutcome>>,
}

impl CollectingListener {
    /// Creates a new collecting listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collecting listener behind an `Arc`, ready to register.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns all collected notifications.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.read().clone()
    }

    /// Returns the collected notification names, in order.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.read().iter().map(LifecycleEvent::name).collect()
    }

    /// Returns all collected outcomes.
    #[must_use]
    pub fn outcomes(&self) -> Vec<TestOutcome> {
        self.outcomes.read().clone()
    }

    /// Returns the number of collected notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears everything collected so far.
    pub fn clear(&self) {
        self.events.write().clear();
        self.outcomes.write().clear();
    }
}

impl StepListener for CollectingListener {
    fn name(&self) -> &str {
        "collecting"
    }

    fn on_event(&self, event: &LifecycleEvent) -> anyhow::Result<()> {
        self.events.write().push(event.clone());
        Ok(())
    }

    fn outcome_ready(&self, outcome: &TestOutcome) -> anyhow::Result<()> {
        self.outcomes.write().push(outcome.clone());
        Ok(())
    }
}
