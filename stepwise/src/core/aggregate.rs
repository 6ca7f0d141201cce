//! Result aggregation.
//!
//! A parent's result is the highest-precedence result among its children
//! (`Error > Failure > Pending > Skipped > Ignored > Success`), and its duration
//! is the sum of the children's durations.

use super::{TestResult, TestStep};
use serde::{Deserialize, Serialize};

/// Combines child results into a parent result.
///
/// An empty input aggregates to [`TestResult::Success`]: a group with no
/// recorded steps is vacuously successful.
#[must_use]
pub fn aggregate<I>(results: I) -> TestResult
where
    I: IntoIterator<Item = TestResult>,
{
    results.into_iter().max().unwrap_or(TestResult::Success)
}

/// Sums child durations in milliseconds.
#[must_use]
pub fn aggregate_duration<I>(durations: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    durations.into_iter().fold(0_u64, u64::saturating_add)
}

/// Leaf-level result counts for a step tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounts {
    /// Leaves that succeeded.
    pub passing: usize,
    /// Leaves that failed an assertion.
    pub failing: usize,
    /// Leaves that raised an error.
    pub errors: usize,
    /// Leaves that were skipped.
    pub skipped: usize,
    /// Leaves that were ignored.
    pub ignored: usize,
    /// Leaves that are pending.
    pub pending: usize,
    /// Leaves with no result.
    pub unspecified: usize,
}

impl StepCounts {
    /// Counts the leaves below `steps`.
    #[must_use]
    pub fn from_steps(steps: &[TestStep]) -> Self {
        let mut counts = Self::default();
        for step in steps {
            counts.add_step(step);
        }
        counts
    }

    fn add_step(&mut self, step: &TestStep) {
        if step.is_group() {
            for child in step.children() {
                self.add_step(child);
            }
        } else {
            self.add(step.result());
        }
    }

    /// Adds a single result.
    pub fn add(&mut self, result: TestResult) {
        match result {
            TestResult::Success => self.passing += 1,
            TestResult::Failure => self.failing += 1,
            TestResult::Error => self.errors += 1,
            TestResult::Skipped => self.skipped += 1,
            TestResult::Ignored => self.ignored += 1,
            TestResult::Pending => self.pending += 1,
            TestResult::Unspecified => self.unspecified += 1,
        }
    }

    /// Adds another set of counts to this one.
    pub fn merge(&mut self, other: &Self) {
        self.passing += other.passing;
        self.failing += other.failing;
        self.errors += other.errors;
        self.skipped += other.skipped;
        self.ignored += other.ignored;
        self.pending += other.pending;
        self.unspecified += other.unspecified;
    }

    /// Total number of leaves.
    #[must_use]
    pub fn total(&self) -> usize {
        self.passing
            + self.failing
            + self.errors
            + self.skipped
            + self.ignored
            + self.pending
            + self.unspecified
    }

    /// Leaves that failed or errored.
    #[must_use]
    pub fn failing_or_error(&self) -> usize {
        self.failing + self.errors
    }

    /// Leaves that did not execute.
    #[must_use]
    pub fn not_executed(&self) -> usize {
        self.skipped + self.ignored + self.pending
    }
}
