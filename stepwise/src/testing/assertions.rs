//! Test assertions for produced outcomes.

use crate::core::{TestOutcome, TestResult};

/// Asserts that the outcome has the expected overall result.
pub fn assert_outcome_result(outcome: &TestOutcome, expected: TestResult) {
    assert_eq!(
        outcome.result(),
        expected,
        "Expected '{}' to be {}, got {}",
        outcome.name(),
        expected,
        outcome.result()
    );
}

/// Asserts that the outcome passed.
pub fn assert_outcome_succeeded(outcome: &TestOutcome) {
    assert!(
        outcome.is_success(),
        "Expected '{}' to succeed, got {}",
        outcome.name(),
        outcome.result()
    );
}

/// Asserts that the outcome failed or errored.
pub fn assert_outcome_failed(outcome: &TestOutcome) {
    assert!(
        outcome.result().is_failure(),
        "Expected '{}' to fail, got {}",
        outcome.name(),
        outcome.result()
    );
}

/// Asserts the results of the top-level steps, in order.
pub fn assert_step_results(outcome: &TestOutcome, expected: &[TestResult]) {
    let actual: Vec<TestResult> = outcome.steps().iter().map(|s| s.result()).collect();
    assert_eq!(
        actual,
        expected,
        "Unexpected step results for '{}'",
        outcome.name()
    );
}

/// Asserts that the outcome carries a tag with the given name.
pub fn assert_has_tag(outcome: &TestOutcome, name: &str) {
    assert!(
        outcome.has_tag(name),
        "Expected '{}' to carry tag '{}'. Tags: {:?}",
        outcome.name(),
        name,
        outcome.tags()
    );
}

/// Asserts that some warning on the outcome contains `fragment`.
pub fn assert_warning_contains(outcome: &TestOutcome, fragment: &str) {
    assert!(
        outcome.warnings().iter().any(|w| w.contains(fragment)),
        "Expected a warning containing '{}'. Warnings: {:?}",
        fragment,
        outcome.warnings()
    );
}
