//! Lifecycle notifications delivered to listeners.

use super::StepListener;
use crate::core::{FailureCause, Tag, TestResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A normalized lifecycle notification.
///
/// The bus builds one of these for every accepted inbound event and hands it
/// to each listener in registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A suite began.
    TestSuiteStarted {
        /// The suite identifier.
        suite_id: String,
    },
    /// A test began.
    TestStarted {
        /// The test name.
        name: String,
        /// Tags supplied by the runner.
        tags: Vec<Tag>,
    },
    /// A step began.
    StepStarted {
        /// The step description.
        description: String,
        /// Nesting depth, 1 for a top-level step.
        depth: usize,
    },
    /// A step that will not execute began.
    SkippedStepStarted {
        /// The step description.
        description: String,
        /// Nesting depth, 1 for a top-level step.
        depth: usize,
    },
    /// The current step finished normally.
    StepFinished {
        /// The step description.
        description: String,
        /// The step's sealed (aggregated) result.
        result: TestResult,
    },
    /// The current step failed.
    StepFailed {
        /// The step description.
        description: String,
        /// What went wrong.
        cause: FailureCause,
    },
    /// The current step was ignored.
    StepIgnored {
        /// The step description.
        description: String,
        /// Why it was ignored.
        reason: String,
    },
    /// The current step is pending.
    StepPending {
        /// The step description.
        description: String,
        /// Why it is pending.
        reason: String,
    },
    /// A data-driven example row began.
    ExampleStarted {
        /// 1-based row number within the test.
        number: usize,
        /// The row's parameters.
        parameters: BTreeMap<String, String>,
    },
    /// The current example row finished.
    ExampleFinished {
        /// The example's description.
        description: String,
        /// The example's aggregated result.
        result: TestResult,
    },
    /// A screenshot was attached to a step.
    ScreenshotTaken {
        /// The step the screenshot was attached to.
        description: String,
        /// Where the screenshot lives.
        reference: String,
    },
    /// The test failed outside any step.
    TestFailed {
        /// The test name.
        name: String,
        /// What went wrong.
        cause: FailureCause,
    },
    /// The test was annotated as ignored, pending or skipped.
    TestAnnotated {
        /// The test name.
        name: String,
        /// The annotated result.
        result: TestResult,
    },
    /// The test finished; its outcome follows via `outcome_ready`.
    TestFinished {
        /// The test name.
        name: String,
        /// The final aggregated result.
        result: TestResult,
    },
    /// The suite finished.
    TestSuiteFinished {
        /// The suite identifier.
        suite_id: String,
    },
}

impl LifecycleEvent {
    /// The event's name, as used in logs and error reports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::TestSuiteStarted { .. } => "test_suite_started",
            Self::TestStarted { .. } => "test_started",
            Self::StepStarted { .. } => "step_started",
            Self::SkippedStepStarted { .. } => "skipped_step_started",
            Self::StepFinished { .. } => "step_finished",
            Self::StepFailed { .. } => "step_failed",
            Self::StepIgnored { .. } => "step_ignored",
            Self::StepPending { .. } => "step_pending",
            Self::ExampleStarted { .. } => "example_started",
            Self::ExampleFinished { .. } => "example_finished",
            Self::ScreenshotTaken { .. } => "screenshot_taken",
            Self::TestFailed { .. } => "test_failed",
            Self::TestAnnotated { .. } => "test_annotated",
            Self::TestFinished { .. } => "test_finished",
            Self::TestSuiteFinished { .. } => "test_suite_finished",
        }
    }

    /// Delivers the event to a listener: first `on_event`, then the matching
    /// typed callback.
    pub fn deliver_to(&self, listener: &dyn StepListener) -> anyhow::Result<()> {
        listener.on_event(self)?;
        match self {
            Self::TestSuiteStarted { suite_id } => listener.test_suite_started(suite_id),
            Self::TestStarted { name, tags } => listener.test_started(name, tags),
            Self::StepStarted { description, .. } => listener.step_started(description),
            Self::SkippedStepStarted { description, .. } => {
                listener.skipped_step_started(description)
            }
            Self::StepFinished { description, .. } => listener.step_finished(description),
            Self::StepFailed { description, cause } => listener.step_failed(description, cause),
            Self::StepIgnored {
                description,
                reason,
            } => listener.step_ignored(description, reason),
            Self::StepPending {
                description,
                reason,
            } => listener.step_pending(description, reason),
            Self::ExampleStarted { parameters, .. } => listener.example_started(parameters),
            Self::ExampleFinished { description, .. } => listener.example_finished(description),
            Self::ScreenshotTaken { reference, .. } => listener.screenshot_taken(reference),
            Self::TestFailed { name, cause } => listener.test_failed(name, cause),
            Self::TestAnnotated { name, result } => listener.test_annotated(name, *result),
            Self::TestFinished { name, .. } => listener.test_finished(name),
            Self::TestSuiteFinished { suite_id } => listener.test_suite_finished(suite_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let event = LifecycleEvent::StepStarted {
            description: "submit".to_string(),
            depth: 1,
        };
        assert_eq!(event.name(), "step_started");
    }

    #[test]
    fn test_event_serialization() {
        let event = LifecycleEvent::StepFailed {
            description: "submit".to_string(),
            cause: FailureCause::assertion("expected dashboard"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "step_failed");
        assert_eq!(json["cause"]["kind"], "assertion");

        let back: LifecycleEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
