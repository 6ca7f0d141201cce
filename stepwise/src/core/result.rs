//! Test result values and their precedence.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The result of a step or test.
///
/// Variants are declared in ascending precedence, so the derived `Ord` is the
/// aggregation order: when results are combined the greatest one wins.
/// `Unspecified` marks a step that is still open and sits below everything else.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TestResult {
    /// No result recorded yet.
    #[default]
    Unspecified,
    /// Completed successfully.
    Success,
    /// Deliberately not run.
    Ignored,
    /// Not run because of an earlier condition.
    Skipped,
    /// Explicitly marked as not yet implemented.
    Pending,
    /// An assertion did not hold.
    Failure,
    /// An unexpected error was raised.
    Error,
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => write!(f, "unspecified"),
            Self::Success => write!(f, "success"),
            Self::Ignored => write!(f, "ignored"),
            Self::Skipped => write!(f, "skipped"),
            Self::Pending => write!(f, "pending"),
            Self::Failure => write!(f, "failure"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl TestResult {
    /// All results, lowest precedence first.
    pub const ALL: [Self; 7] = [
        Self::Unspecified,
        Self::Success,
        Self::Ignored,
        Self::Skipped,
        Self::Pending,
        Self::Failure,
        Self::Error,
    ];

    /// Returns true if the result counts as a pass.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if the result is a failure or an error.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure | Self::Error)
    }

    /// Returns true if the step did not actually execute.
    #[must_use]
    pub fn is_not_executed(&self) -> bool {
        matches!(self, Self::Ignored | Self::Skipped | Self::Pending)
    }

    /// Returns true once a terminal result has been recorded.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unspecified)
    }
}
