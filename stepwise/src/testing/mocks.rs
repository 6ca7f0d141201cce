//! Mock listeners for testing.

use crate::core::TestOutcome;
use crate::events::{LifecycleEvent, StepListener};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A listener that returns an error from every notification and outcome.
#[derive(Debug)]
pub struct FailingListener {
    message: String,
    calls: AtomicUsize,
}

impl FailingListener {
    /// Creates a listener failing with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of callbacks that failed.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("{}", self.message)
    }
}

impl StepListener for FailingListener {
    fn name(&self) -> &str {
        "failing"
    }

    fn on_event(&self, _event: &LifecycleEvent) -> anyhow::Result<()> {
        self.fail()
    }

    fn outcome_ready(&self, _outcome: &TestOutcome) -> anyhow::Result<()> {
        self.fail()
    }
}

/// A listener that panics on every notification and outcome.
#[derive(Debug, Default)]
pub struct PanickingListener;

impl PanickingListener {
    /// Creates a panicking listener.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl StepListener for PanickingListener {
    fn name(&self) -> &str {
        "panicking"
    }

    fn on_event(&self, event: &LifecycleEvent) -> anyhow::Result<()> {
        panic!("listener blew up on {}", event.name())
    }

    fn outcome_ready(&self, outcome: &TestOutcome) -> anyhow::Result<()> {
        panic!("listener blew up on outcome of {}", outcome.name())
    }
}

/// A listener that counts notifications and outcomes.
#[derive(Debug, Default)]
pub struct CountingListener {
    events: AtomicUsize,
    outcomes: AtomicUsize,
}

impl CountingListener {
    /// Creates a counting listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications seen.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.load(Ordering::SeqCst)
    }

    /// Outcomes seen.
    #[must_use]
    pub fn outcome_count(&self) -> usize {
        self.outcomes.load(Ordering::SeqCst)
    }
}

impl StepListener for CountingListener {
    fn name(&self) -> &str {
        "counting"
    }

    fn on_event(&self, _event: &LifecycleEvent) -> anyhow::Result<()> {
        self.events.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn outcome_ready(&self, _outcome: &TestOutcome) -> anyhow::Result<()> {
        self.outcomes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
