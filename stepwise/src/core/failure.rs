//! Failure causes attached to steps and outcomes.

use super::TestResult;
use serde::{Deserialize, Serialize};

/// Broad classification of what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An assertion did not hold.
    Assertion,
    /// An unexpected error was raised by the code under test.
    Error,
    /// The test environment itself was broken (setup, fixtures, infrastructure).
    Compromised,
}

/// What caused a step or test to fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCause {
    /// Classification of the failure.
    pub kind: FailureKind,
    /// The raised error's type name (e.g. `AssertionError`).
    pub error_type: String,
    /// The error message.
    pub message: String,
    /// The top few frames of the stack, innermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack_summary: Vec<String>,
}

impl FailureCause {
    /// Creates a new failure cause.
    #[must_use]
    pub fn new(
        kind: FailureKind,
        error_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            error_type: error_type.into(),
            message: message.into(),
            stack_summary: Vec::new(),
        }
    }

    /// Creates an assertion failure.
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Assertion, "AssertionError", message)
    }

    /// Creates an unexpected error.
    #[must_use]
    pub fn error(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Error, error_type, message)
    }

    /// Attaches a stack summary.
    #[must_use]
    pub fn with_stack_summary(mut self, frames: Vec<String>) -> Self {
        self.stack_summary = frames;
        self
    }

    /// The result a step or test gets when it fails with this cause.
    #[must_use]
    pub fn result(&self) -> TestResult {
        match self.kind {
            FailureKind::Assertion => TestResult::Failure,
            FailureKind::Error | FailureKind::Compromised => TestResult::Error,
        }
    }
}
