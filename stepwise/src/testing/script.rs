//! A scripted driver for replaying inbound event sequences.

use crate::core::{FailureCause, Tag, TestOutcome};
use crate::errors::ProtocolViolationError;
use crate::events::StepEventBus;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One inbound event of a script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptAction {
    /// `test_suite_started`.
    SuiteStarted(String),
    /// `test_started`.
    TestStarted(String, Vec<Tag>),
    /// `step_started`.
    StepStarted(String),
    /// `skipped_step_started`.
    SkippedStepStarted(String),
    /// `step_finished`.
    StepFinished,
    /// `step_failed`.
    StepFailed(FailureCause),
    /// `step_ignored`.
    StepIgnored(String),
    /// `step_pending`.
    StepPending(String),
    /// `example_started`.
    ExampleStarted(BTreeMap<String, String>),
    /// `example_finished`.
    ExampleFinished,
    /// `screenshot_taken`.
    Screenshot(String),
    /// `test_failed`.
    TestFailed(FailureCause),
    /// `test_finished`.
    TestFinished,
    /// `test_suite_finished`.
    SuiteFinished,
}

/// An ordered list of inbound events, built fluently and replayed on a bus.
///
/// ```rust,ignore
/// let outcomes = EventScript::new()
///     .test("login")
///     .step("open page")
///     .finish_step()
///     .finish_test()
///     .run(&mut bus)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventScript {
    actions: Vec<ScriptAction>,
}

impl EventScript {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an arbitrary action.
    #[must_use]
    pub fn then(mut self, action: ScriptAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Starts a suite.
    #[must_use]
    pub fn suite(self, suite_id: impl Into<String>) -> Self {
        self.then(ScriptAction::SuiteStarted(suite_id.into()))
    }

    /// Starts an untagged test.
    #[must_use]
    pub fn test(self, name: impl Into<String>) -> Self {
        self.then(ScriptAction::TestStarted(name.into(), Vec::new()))
    }

    /// Starts a tagged test.
    #[must_use]
    pub fn tagged_test(self, name: impl Into<String>, tags: Vec<Tag>) -> Self {
        self.then(ScriptAction::TestStarted(name.into(), tags))
    }

    /// Opens a step.
    #[must_use]
    pub fn step(self, description: impl Into<String>) -> Self {
        self.then(ScriptAction::StepStarted(description.into()))
    }

    /// Opens a skipped step.
    #[must_use]
    pub fn skipped_step(self, description: impl Into<String>) -> Self {
        self.then(ScriptAction::SkippedStepStarted(description.into()))
    }

    /// Finishes the current step.
    #[must_use]
    pub fn finish_step(self) -> Self {
        self.then(ScriptAction::StepFinished)
    }

    /// Opens and finishes a step.
    #[must_use]
    pub fn passing_step(self, description: impl Into<String>) -> Self {
        self.step(description).finish_step()
    }

    /// Fails the current step with an assertion failure.
    #[must_use]
    pub fn fail_step(self, message: impl Into<String>) -> Self {
        self.then(ScriptAction::StepFailed(FailureCause::assertion(message)))
    }

    /// Fails the current step with an unexpected error.
    #[must_use]
    pub fn error_step(self, error_type: impl Into<String>, message: impl Into<String>) -> Self {
        self.then(ScriptAction::StepFailed(FailureCause::error(error_type, message)))
    }

    /// Ignores the current step.
    #[must_use]
    pub fn ignore_step(self, reason: impl Into<String>) -> Self {
        self.then(ScriptAction::StepIgnored(reason.into()))
    }

    /// Marks the current step pending.
    #[must_use]
    pub fn pending_step(self, reason: impl Into<String>) -> Self {
        self.then(ScriptAction::StepPending(reason.into()))
    }

    /// Opens an example row.
    #[must_use]
    pub fn example<K, V>(self, parameters: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let parameters = parameters
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.then(ScriptAction::ExampleStarted(parameters))
    }

    /// Closes the current example row.
    #[must_use]
    pub fn finish_example(self) -> Self {
        self.then(ScriptAction::ExampleFinished)
    }

    /// Attaches a screenshot.
    #[must_use]
    pub fn screenshot(self, reference: impl Into<String>) -> Self {
        self.then(ScriptAction::Screenshot(reference.into()))
    }

    /// Fails the test outside any step.
    #[must_use]
    pub fn fail_test(self, cause: FailureCause) -> Self {
        self.then(ScriptAction::TestFailed(cause))
    }

    /// Finishes the current test.
    #[must_use]
    pub fn finish_test(self) -> Self {
        self.then(ScriptAction::TestFinished)
    }

    /// Finishes the suite.
    #[must_use]
    pub fn finish_suite(self) -> Self {
        self.then(ScriptAction::SuiteFinished)
    }

    /// The scripted actions, in order.
    #[must_use]
    pub fn actions(&self) -> &[ScriptAction] {
        &self.actions
    }

    /// Replays the script on `bus`, returning every outcome produced.
    ///
    /// Stops at the first protocol violation.
    pub fn run(&self, bus: &mut StepEventBus) -> Result<Vec<Arc<TestOutcome>>, ProtocolViolationError> {
        let mut outcomes = Vec::new();
        for action in &self.actions {
            match action.clone() {
                ScriptAction::SuiteStarted(id) => bus.test_suite_started(id)?,
                ScriptAction::TestStarted(name, tags) => bus.test_started(name, tags)?,
                ScriptAction::StepStarted(description) => bus.step_started(description)?,
                ScriptAction::SkippedStepStarted(description) => {
                    bus.skipped_step_started(description)?;
                }
                ScriptAction::StepFinished => bus.step_finished()?,
                ScriptAction::StepFailed(cause) => bus.step_failed(cause)?,
                ScriptAction::StepIgnored(reason) => bus.step_ignored(reason)?,
                ScriptAction::StepPending(reason) => bus.step_pending(reason)?,
                ScriptAction::ExampleStarted(parameters) => bus.example_started(parameters)?,
                ScriptAction::ExampleFinished => bus.example_finished()?,
                ScriptAction::Screenshot(reference) => bus.screenshot_taken(reference)?,
                ScriptAction::TestFailed(cause) => bus.test_failed(cause)?,
                ScriptAction::TestFinished => outcomes.push(bus.test_finished()?),
                ScriptAction::SuiteFinished => bus.test_suite_finished()?,
            }
        }
        Ok(outcomes)
    }

    /// Replays the script and returns the single outcome it produced.
    ///
    /// Returns `None` if the script produced no outcome.
    pub fn run_single(&self, bus: &mut StepEventBus) -> Result<Option<Arc<TestOutcome>>, ProtocolViolationError> {
        Ok(self.run(bus)?.pop())
    }
}
