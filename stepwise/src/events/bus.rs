//! The per-context event bus.
//!
//! The bus owns the in-flight [`TestOutcome`] and the stack of open steps. It
//! is driven by exactly one thread: the test-execution thread that owns its
//! context.

use super::{LifecycleEvent, StepListener};
use crate::config::BusConfig;
use crate::core::{FailureCause, FailureKind, Tag, TestOutcome, TestResult, TestStep};
use crate::errors::{ListenerFailure, ProtocolViolationError};
use crate::utils::{Clock, SystemClock};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Where the bus is in the suite/test lifecycle.
///
/// "A step is running" is not a separate state: it is `TestRunning` with a
/// non-empty open-step stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusState {
    /// No suite is running.
    Idle,
    /// A suite is running between tests.
    SuiteRunning,
    /// A test is running.
    TestRunning,
}

impl fmt::Display for BusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::SuiteRunning => write!(f, "suite_running"),
            Self::TestRunning => write!(f, "test_running"),
        }
    }
}

#[derive(Debug, Clone)]
struct OpenStep {
    path: Vec<usize>,
    skipped: bool,
    example: bool,
}

/// Routes lifecycle events for one execution context.
pub struct StepEventBus {
    label: String,
    state: BusState,
    suite_id: Option<String>,
    current: Option<TestOutcome>,
    open_steps: Vec<OpenStep>,
    completed: Vec<Arc<TestOutcome>>,
    listeners: Vec<Arc<dyn StepListener>>,
    listener_failures: Vec<ListenerFailure>,
    clock: Arc<dyn Clock>,
    config: BusConfig,
}

impl fmt::Debug for StepEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepEventBus")
            .field("label", &self.label)
            .field("state", &self.state)
            .field("suite_id", &self.suite_id)
            .field("open_steps", &self.open_steps.len())
            .field("completed", &self.completed.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for StepEventBus {
    fn default() -> Self {
        Self::new("default")
    }
}

impl StepEventBus {
    /// Creates an idle bus with the wall clock and default configuration.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: BusState::Idle,
            suite_id: None,
            current: None,
            open_steps: Vec::new(),
            completed: Vec::new(),
            listeners: Vec::new(),
            listener_failures: Vec::new(),
            clock: Arc::new(SystemClock),
            config: BusConfig::default(),
        }
    }

    /// Sets the clock used to time steps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a listener. Listeners are notified in registration order.
    pub fn register_listener(&mut self, listener: Arc<dyn StepListener>) {
        self.listeners.push(listener);
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// The label used in logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BusState {
        self.state
    }

    /// The running suite's id.
    #[must_use]
    pub fn suite_id(&self) -> Option<&str> {
        self.suite_id.as_deref()
    }

    /// The outcome being recorded, while a test runs.
    #[must_use]
    pub fn current_outcome(&self) -> Option<&TestOutcome> {
        self.current.as_ref()
    }

    /// The step on top of the open-step stack.
    #[must_use]
    pub fn current_step(&self) -> Option<&TestStep> {
        let top = self.open_steps.last()?;
        self.current.as_ref()?.step_at(&top.path)
    }

    /// Number of open steps.
    #[must_use]
    pub fn current_step_depth(&self) -> usize {
        self.open_steps.len()
    }

    /// Returns true if the running test has already failed or errored.
    #[must_use]
    pub fn a_step_has_failed(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|outcome| outcome.result().is_failure())
    }

    /// Outcomes completed since the current suite started.
    #[must_use]
    pub fn completed_outcomes(&self) -> &[Arc<TestOutcome>] {
        &self.completed
    }

    /// Drains the completed outcomes.
    pub fn take_completed_outcomes(&mut self) -> Vec<Arc<TestOutcome>> {
        std::mem::take(&mut self.completed)
    }

    /// Listener failures caught so far.
    #[must_use]
    pub fn listener_failures(&self) -> &[ListenerFailure] {
        &self.listener_failures
    }

    /// Starts a suite, resetting the open-step stack, completed outcomes and
    /// listener failures.
    pub fn test_suite_started(
        &mut self,
        suite_id: impl Into<String>,
    ) -> Result<(), ProtocolViolationError> {
        let suite_id = suite_id.into();
        self.reject_during_test("test_suite_started", "a test is still running")?;

        self.state = BusState::SuiteRunning;
        self.suite_id = Some(suite_id.clone());
        self.open_steps.clear();
        self.completed.clear();
        self.listener_failures.clear();
        debug!(context = %self.label, suite = %suite_id, "Suite started");

        self.dispatch(&LifecycleEvent::TestSuiteStarted { suite_id });
        Ok(())
    }

    /// Starts a test. Allowed from `Idle` too, in which case the test runs
    /// without a suite.
    pub fn test_started(
        &mut self,
        name: impl Into<String>,
        tags: Vec<Tag>,
    ) -> Result<(), ProtocolViolationError> {
        let name = name.into();
        self.reject_during_test("test_started", "a test is already running")?;

        let mut outcome = TestOutcome::new(name.clone())
            .with_start_time(self.clock.now())
            .with_tags(tags.iter().cloned());
        if !self.config.humanize_titles {
            outcome = outcome.with_title(name.clone());
        }
        if let Some(ref suite) = self.suite_id {
            outcome = outcome.with_suite(suite.clone());
        }

        self.current = Some(outcome);
        self.open_steps.clear();
        self.state = BusState::TestRunning;
        debug!(context = %self.label, test = %name, "Test started");

        self.dispatch(&LifecycleEvent::TestStarted { name, tags });
        Ok(())
    }

    /// Opens a step under the current step.
    pub fn step_started(
        &mut self,
        description: impl Into<String>,
    ) -> Result<(), ProtocolViolationError> {
        let description = description.into();
        let depth = self.open_step("step_started", &description, false, false)?;
        self.dispatch(&LifecycleEvent::StepStarted { description, depth });
        Ok(())
    }

    /// Opens a step that will not execute. It is sealed as `Skipped` when it
    /// finishes normally, and steps nested under it are skipped too.
    pub fn skipped_step_started(
        &mut self,
        description: impl Into<String>,
    ) -> Result<(), ProtocolViolationError> {
        let description = description.into();
        let depth = self.open_step("skipped_step_started", &description, true, false)?;
        self.dispatch(&LifecycleEvent::SkippedStepStarted { description, depth });
        Ok(())
    }

    /// Seals the current step as finished.
    pub fn step_finished(&mut self) -> Result<(), ProtocolViolationError> {
        let (description, result) = self.close_step("step_finished", |step, end, skipped| {
            let result = if skipped {
                TestResult::Skipped
            } else {
                TestResult::Success
            };
            step.seal(result, end);
        })?;
        self.dispatch(&LifecycleEvent::StepFinished {
            description,
            result,
        });
        Ok(())
    }

    /// Seals the current step as failed.
    pub fn step_failed(&mut self, cause: FailureCause) -> Result<(), ProtocolViolationError> {
        let recorded = cause.clone();
        let (description, _) = self.close_step("step_failed", move |step, end, _| {
            step.seal_with_failure(recorded, end);
        })?;
        self.dispatch(&LifecycleEvent::StepFailed { description, cause });
        Ok(())
    }

    /// Seals the current step as ignored.
    pub fn step_ignored(&mut self, reason: impl Into<String>) -> Result<(), ProtocolViolationError> {
        let reason = reason.into();
        let (description, _) = self.close_step("step_ignored", |step, end, _| {
            step.seal(TestResult::Ignored, end);
        })?;
        self.dispatch(&LifecycleEvent::StepIgnored {
            description,
            reason,
        });
        Ok(())
    }

    /// Seals the current step as pending.
    pub fn step_pending(&mut self, reason: impl Into<String>) -> Result<(), ProtocolViolationError> {
        let reason = reason.into();
        let (description, _) = self.close_step("step_pending", |step, end, _| {
            step.seal(TestResult::Pending, end);
        })?;
        self.dispatch(&LifecycleEvent::StepPending {
            description,
            reason,
        });
        Ok(())
    }

    /// Opens a group step for one data-driven example row.
    pub fn example_started(
        &mut self,
        parameters: BTreeMap<String, String>,
    ) -> Result<(), ProtocolViolationError> {
        self.require_test("example_started")?;
        let number = self
            .current
            .as_mut()
            .map_or(0, TestOutcome::next_example_number);
        let description = example_description(number, &parameters);
        self.open_step("example_started", &description, false, true)?;
        self.dispatch(&LifecycleEvent::ExampleStarted { number, parameters });
        Ok(())
    }

    /// Seals the current example row.
    pub fn example_finished(&mut self) -> Result<(), ProtocolViolationError> {
        self.require_test("example_finished")?;
        if !self.open_steps.last().is_some_and(|top| top.example) {
            return Err(self.violation("example_finished", "the current step is not an example"));
        }
        let (description, result) = self.close_step("example_finished", |step, end, skipped| {
            let result = if skipped {
                TestResult::Skipped
            } else {
                TestResult::Success
            };
            step.seal(result, end);
        })?;
        self.dispatch(&LifecycleEvent::ExampleFinished {
            description,
            result,
        });
        Ok(())
    }

    /// Attaches a screenshot to the current step, or to the last top-level
    /// step when none is open.
    pub fn screenshot_taken(
        &mut self,
        reference: impl Into<String>,
    ) -> Result<(), ProtocolViolationError> {
        let reference = reference.into();
        self.require_test("screenshot_taken")?;

        let path = match self.open_steps.last() {
            Some(top) => top.path.clone(),
            None => match self.current.as_ref().map(|o| o.steps().len()) {
                Some(len) if len > 0 => vec![len - 1],
                _ => {
                    return Err(
                        self.violation("screenshot_taken", "there is no step to attach it to")
                    )
                }
            },
        };

        let attached = reference.clone();
        let description = self
            .current
            .as_mut()
            .and_then(|outcome| {
                outcome.update_step(&path, move |step| {
                    step.add_screenshot(attached);
                    step.description().to_string()
                })
            })
            .unwrap_or_default();

        self.dispatch(&LifecycleEvent::ScreenshotTaken {
            description,
            reference,
        });
        Ok(())
    }

    /// Records a failure that happened outside any step.
    pub fn test_failed(&mut self, cause: FailureCause) -> Result<(), ProtocolViolationError> {
        self.require_test("test_failed")?;
        let name = match self.current.as_mut() {
            Some(outcome) => {
                outcome.set_failure_cause(cause.clone());
                outcome.name().to_string()
            }
            None => String::new(),
        };
        self.dispatch(&LifecycleEvent::TestFailed { name, cause });
        Ok(())
    }

    /// Marks the running test as ignored.
    pub fn test_ignored(&mut self) -> Result<(), ProtocolViolationError> {
        self.annotate("test_ignored", TestResult::Ignored)
    }

    /// Marks the running test as pending.
    pub fn test_pending(&mut self) -> Result<(), ProtocolViolationError> {
        self.annotate("test_pending", TestResult::Pending)
    }

    /// Marks the running test as skipped.
    pub fn test_skipped(&mut self) -> Result<(), ProtocolViolationError> {
        self.annotate("test_skipped", TestResult::Skipped)
    }

    /// Finishes the running test and hands its outcome to every listener.
    ///
    /// Steps still open are force-sealed as `Error`, innermost first, and a
    /// warning is logged and recorded on the outcome.
    pub fn test_finished(&mut self) -> Result<Arc<TestOutcome>, ProtocolViolationError> {
        self.require_test("test_finished")?;
        let Some(mut outcome) = self.current.take() else {
            return Err(self.violation("test_finished", "no outcome is being recorded"));
        };
        let end = self.clock.now();

        if !self.open_steps.is_empty() {
            let unterminated = self.open_steps.len();
            let mut descriptions = Vec::with_capacity(unterminated);
            while let Some(open) = self.open_steps.pop() {
                let cause = FailureCause::new(
                    FailureKind::Error,
                    "UnterminatedStep",
                    "step was still open when the test finished",
                );
                if let Some(description) = outcome.update_step(&open.path, |step| {
                    step.seal_with_failure(cause, end);
                    step.description().to_string()
                }) {
                    descriptions.push(description);
                }
            }

            warn!(
                context = %self.label,
                test = outcome.name(),
                unterminated,
                steps = ?descriptions,
                "Unbalanced step stack at test finish; open steps sealed as error"
            );
            if self.config.record_unbalanced_warnings {
                outcome.add_warning(format!(
                    "{unterminated} step(s) were still open when the test finished and were sealed as error: {}",
                    descriptions.join(", ")
                ));
            }
        }

        outcome.finish(end);
        let outcome = Arc::new(outcome);
        self.completed.push(Arc::clone(&outcome));
        trim_oldest(&mut self.completed, self.config.max_retained);
        self.state = BusState::SuiteRunning;
        debug!(
            context = %self.label,
            test = outcome.name(),
            result = %outcome.result(),
            "Test finished"
        );

        self.dispatch(&LifecycleEvent::TestFinished {
            name: outcome.name().to_string(),
            result: outcome.result(),
        });
        self.dispatch_outcome(&outcome);
        Ok(outcome)
    }

    /// Finishes the suite. A no-op when no suite is running.
    pub fn test_suite_finished(&mut self) -> Result<(), ProtocolViolationError> {
        self.reject_during_test("test_suite_finished", "a test is still running")?;
        if self.state == BusState::Idle {
            debug!(context = %self.label, "Suite finished while idle; nothing to flush");
            return Ok(());
        }

        let suite_id = self.suite_id.take().unwrap_or_default();
        self.state = BusState::Idle;
        self.open_steps.clear();
        debug!(context = %self.label, suite = %suite_id, outcomes = self.completed.len(), "Suite finished");

        self.dispatch(&LifecycleEvent::TestSuiteFinished { suite_id });
        Ok(())
    }

    fn annotate(&mut self, event: &str, result: TestResult) -> Result<(), ProtocolViolationError> {
        self.require_test(event)?;
        let name = match self.current.as_mut() {
            Some(outcome) => {
                outcome.set_annotated_result(result);
                outcome.name().to_string()
            }
            None => String::new(),
        };
        self.dispatch(&LifecycleEvent::TestAnnotated { name, result });
        Ok(())
    }

    /// Records a new step under the top of the stack and pushes it.
    /// Returns the new depth.
    fn open_step(
        &mut self,
        event: &str,
        description: &str,
        skipped: bool,
        example: bool,
    ) -> Result<usize, ProtocolViolationError> {
        self.require_test(event)?;

        let (parent, inherited_skip) = self
            .open_steps
            .last()
            .map_or((Vec::new(), false), |top| (top.path.clone(), top.skipped));
        let step = TestStep::new(description, self.clock.now());

        let path = self
            .current
            .as_mut()
            .and_then(|outcome| outcome.record_step_under(&parent, step))
            .ok_or_else(|| self.violation(event, "the open step could not be located"))?;

        self.open_steps.push(OpenStep {
            path,
            skipped: skipped || inherited_skip,
            example,
        });
        trace!(context = %self.label, step = description, depth = self.open_steps.len(), "Step opened");
        Ok(self.open_steps.len())
    }

    /// Seals and pops the top of the stack. Returns its description and
    /// resulting (aggregated) result.
    fn close_step<F>(
        &mut self,
        event: &str,
        seal: F,
    ) -> Result<(String, TestResult), ProtocolViolationError>
    where
        F: FnOnce(&mut TestStep, crate::utils::Timestamp, bool),
    {
        self.require_test(event)?;
        let Some(top) = self.open_steps.last().cloned() else {
            return Err(self.violation(event, "there is no open step"));
        };

        let end = self.clock.now();
        let sealed = self.current.as_mut().and_then(|outcome| {
            outcome.update_step(&top.path, |step| {
                seal(step, end, top.skipped);
                step.description().to_string()
            })
        });
        let Some(description) = sealed else {
            return Err(self.violation(event, "the open step could not be located"));
        };

        self.open_steps.pop();
        let result = self
            .current
            .as_ref()
            .and_then(|outcome| outcome.step_at(&top.path))
            .map_or(TestResult::Unspecified, TestStep::result);
        trace!(context = %self.label, step = %description, %result, "Step closed");
        Ok((description, result))
    }

    fn require_test(&self, event: &str) -> Result<(), ProtocolViolationError> {
        if self.state == BusState::TestRunning {
            Ok(())
        } else {
            Err(self.violation(event, "no test is running"))
        }
    }

    fn reject_during_test(&self, event: &str, message: &str) -> Result<(), ProtocolViolationError> {
        if self.state == BusState::TestRunning {
            Err(self.violation(event, message))
        } else {
            Ok(())
        }
    }

    fn violation(&self, event: &str, message: &str) -> ProtocolViolationError {
        let err = ProtocolViolationError::new(event, self.state.to_string(), message);
        debug!(context = %self.label, error = %err, "Rejected event");
        err
    }

    fn dispatch(&mut self, event: &LifecycleEvent) {
        let test = self.current.as_ref().map(|o| o.name().to_string());
        for listener in &self.listeners {
            let delivered = guarded(self.config.catch_listener_panics, || {
                event.deliver_to(listener.as_ref())
            });
            if let Err(message) = delivered {
                let mut failure = ListenerFailure::new(listener.name(), event.name(), message);
                if let Some(ref test) = test {
                    failure = failure.with_test(test.clone());
                }
                record_failure(
                    &self.label,
                    &mut self.listener_failures,
                    failure,
                    self.config.max_retained,
                );
            }
        }
    }

    fn dispatch_outcome(&mut self, outcome: &TestOutcome) {
        for listener in &self.listeners {
            let delivered = guarded(self.config.catch_listener_panics, || {
                listener.outcome_ready(outcome)
            });
            if let Err(message) = delivered {
                let failure = ListenerFailure::new(listener.name(), "outcome_ready", message)
                    .with_test(outcome.name());
                record_failure(
                    &self.label,
                    &mut self.listener_failures,
                    failure,
                    self.config.max_retained,
                );
            }
        }
    }
}

fn record_failure(
    label: &str,
    failures: &mut Vec<ListenerFailure>,
    failure: ListenerFailure,
    max: usize,
) {
    warn!(
        context = %label,
        listener = %failure.listener,
        event = %failure.event,
        test = ?failure.test,
        error = %failure.message,
        "Listener failed; continuing with remaining listeners"
    );
    failures.push(failure);
    trim_oldest(failures, max);
}

fn trim_oldest<T>(items: &mut Vec<T>, max: usize) {
    let excess = items.len().saturating_sub(max);
    if excess > 0 {
        items.drain(..excess);
    }
}

/// Runs a listener callback, turning errors (and, if enabled, panics) into
/// a message.
fn guarded<F>(catch_panics: bool, f: F) -> Result<(), String>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    if !catch_panics {
        return f().map_err(|e| format!("{e:#}"));
    }
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

fn example_description(number: usize, parameters: &BTreeMap<String, String>) -> String {
    if parameters.is_empty() {
        return format!("Example #{number}");
    }
    let values: Vec<String> = parameters.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("Example #{number}: {{{}}}", values.join(", "))
}
