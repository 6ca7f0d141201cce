//! Roll-up of a set of completed outcomes.

use super::snapshot::ratio;
use crate::core::{aggregate, aggregate_duration, StepCounts, TestOutcome, TestResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Totals over a set of outcomes, such as one suite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    /// Number of outcomes per overall result.
    pub results: BTreeMap<TestResult, usize>,
    /// Leaf step counts across all outcomes.
    pub step_counts: StepCounts,
    /// Sum of outcome durations.
    pub total_duration_ms: u64,
    /// Aggregate of every outcome's result.
    pub overall_result: TestResult,
}

impl OutcomeSummary {
    /// Summarizes `outcomes`. An empty set summarizes to `Success`.
    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a TestOutcome>,
    {
        let mut summary = Self::default();
        let mut durations = Vec::new();
        for outcome in outcomes {
            *summary.results.entry(outcome.result()).or_default() += 1;
            summary.step_counts.merge(&outcome.step_counts());
            durations.push(outcome.duration_ms());
        }
        summary.total_duration_ms = aggregate_duration(durations);
        summary.overall_result = aggregate(summary.results.keys().copied());
        summary
    }

    /// Number of outcomes summarized.
    #[must_use]
    pub fn total_tests(&self) -> usize {
        self.results.values().sum()
    }

    /// Number of outcomes with the given result.
    #[must_use]
    pub fn count(&self, result: TestResult) -> usize {
        self.results.get(&result).copied().unwrap_or(0)
    }

    /// Outcomes that passed.
    #[must_use]
    pub fn passing(&self) -> usize {
        self.count(TestResult::Success)
    }

    /// Outcomes that failed or errored.
    #[must_use]
    pub fn failing(&self) -> usize {
        self.count(TestResult::Failure) + self.count(TestResult::Error)
    }

    /// Percentage of passing outcomes, `0.0` when empty.
    #[must_use]
    pub fn pass_percentage(&self) -> f64 {
        ratio(self.passing(), self.total_tests()) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FailureCause, TestStep};
    use crate::utils::now_utc;
    use pretty_assertions::assert_eq;

    fn outcome(name: &str, results: &[TestResult], duration_ms: u64) -> TestOutcome {
        let mut outcome = TestOutcome::new(name);
        for result in results {
            outcome.record_step(TestStep::leaf("step", *result, now_utc(), duration_ms));
        }
        outcome
    }

    #[test]
    fn test_empty_summary() {
        let summary = OutcomeSummary::from_outcomes(std::iter::empty::<&TestOutcome>());
        assert_eq!(summary.total_tests(), 0);
        assert_eq!(summary.overall_result, TestResult::Success);
        assert_eq!(summary.pass_percentage(), 0.0);
    }

    #[test]
    fn test_summary_counts() {
        let mut errored = outcome("broken", &[TestResult::Success], 5);
        errored.set_failure_cause(FailureCause::error("IoError", "disk full"));
        let outcomes = vec![
            outcome("a", &[TestResult::Success, TestResult::Success], 10),
            outcome("b", &[TestResult::Success, TestResult::Failure], 10),
            outcome("c", &[TestResult::Skipped], 0),
            errored,
        ];

        let summary = OutcomeSummary::from_outcomes(&outcomes);
        assert_eq!(summary.total_tests(), 4);
        assert_eq!(summary.passing(), 1);
        assert_eq!(summary.failing(), 2);
        assert_eq!(summary.count(TestResult::Skipped), 1);
        assert_eq!(summary.overall_result, TestResult::Error);
        assert_eq!(summary.step_counts.total(), 6);
        assert_eq!(summary.pass_percentage(), 25.0);
    }
}
