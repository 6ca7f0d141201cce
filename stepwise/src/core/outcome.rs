//! The root result for one executed test.

use super::step::{step_at_path, update_at_path};
use super::{aggregate, FailureCause, StepCounts, Tag, TestResult, TestStep};
use crate::utils::{elapsed_ms, humanize, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// The complete recorded result of one executed test.
///
/// The overall result is never set directly. It is the aggregation of the
/// top-level step results, the recorded failure cause (if any) and the
/// test-level annotation (if any); with none of these it is `Success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    run_id: Uuid,
    name: String,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suite: Option<String>,
    start_time: Timestamp,
    duration_ms: u64,
    result: TestResult,
    #[serde(default)]
    steps: Vec<TestStep>,
    #[serde(default)]
    tags: BTreeSet<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_cause: Option<FailureCause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotated_result: Option<TestResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(default)]
    example_count: usize,
}

impl TestOutcome {
    /// Creates an outcome for `name`, titled with the humanized name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let title = humanize(&name);
        Self {
            run_id: Uuid::new_v4(),
            name,
            title,
            suite: None,
            start_time: now_utc(),
            duration_ms: 0,
            result: TestResult::Success,
            steps: Vec::new(),
            tags: BTreeSet::new(),
            failure_cause: None,
            annotated_result: None,
            warnings: Vec::new(),
            example_count: 0,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the start time.
    #[must_use]
    pub fn with_start_time(mut self, start_time: Timestamp) -> Self {
        self.start_time = start_time;
        self
    }

    /// Sets the owning suite.
    #[must_use]
    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    /// Adds tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Unique id of this run of the test.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The test method or scenario name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The suite the test ran in, if known.
    #[must_use]
    pub fn suite(&self) -> Option<&str> {
        self.suite.as_deref()
    }

    /// When the test started.
    #[must_use]
    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    /// Wall-clock duration from start to finish, in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// The aggregated result.
    #[must_use]
    pub fn result(&self) -> TestResult {
        self.result
    }

    /// Returns true if the test passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    /// Top-level steps, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[TestStep] {
        &self.steps
    }

    /// Every leaf step, depth first.
    pub fn leaf_steps(&self) -> Vec<&TestStep> {
        self.steps.iter().flat_map(TestStep::leaves).collect()
    }

    /// Number of leaf steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.step_counts().total()
    }

    /// Leaf result counts.
    #[must_use]
    pub fn step_counts(&self) -> StepCounts {
        StepCounts::from_steps(&self.steps)
    }

    /// Tags attached to the test.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<Tag> {
        &self.tags
    }

    /// Returns true if a tag with this name is attached.
    #[must_use]
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|tag| tag.name == name)
    }

    /// Tags of a given type.
    pub fn tags_of_type<'a>(&'a self, tag_type: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.tags.iter().filter(move |tag| tag.tag_type == tag_type)
    }

    /// The failure recorded at test level, if any.
    #[must_use]
    pub fn failure_cause(&self) -> Option<&FailureCause> {
        self.failure_cause.as_ref()
    }

    /// The test-level annotation (ignored/pending/skipped), if any.
    #[must_use]
    pub fn annotated_result(&self) -> Option<TestResult> {
        self.annotated_result
    }

    /// Structural warnings raised while the outcome was recorded.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Number of data-driven example rows executed.
    #[must_use]
    pub fn example_count(&self) -> usize {
        self.example_count
    }

    /// The most recent top-level step.
    #[must_use]
    pub fn last_step(&self) -> Option<&TestStep> {
        self.steps.last()
    }

    /// Appends a step at the top level.
    pub fn record_step(&mut self, step: TestStep) {
        self.steps.push(step);
        self.recompute_result();
    }

    /// Attaches a tag. Duplicate tags are stored once.
    pub fn add_tag(&mut self, tag: Tag) {
        self.tags.insert(tag);
    }

    /// Records a failure that happened outside any step.
    pub fn set_failure_cause(&mut self, cause: FailureCause) {
        self.failure_cause = Some(cause);
        self.recompute_result();
    }

    pub(crate) fn set_annotated_result(&mut self, result: TestResult) {
        self.annotated_result = Some(result);
        self.recompute_result();
    }

    pub(crate) fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub(crate) fn next_example_number(&mut self) -> usize {
        self.example_count += 1;
        self.example_count
    }

    pub(crate) fn finish(&mut self, end_time: Timestamp) {
        self.duration_ms = elapsed_ms(self.start_time, end_time);
        self.recompute_result();
    }

    /// Records `step` under the step at `parent` (top level when empty) and
    /// returns the new step's path.
    pub(crate) fn record_step_under(&mut self, parent: &[usize], step: TestStep) -> Option<Vec<usize>> {
        let index = if parent.is_empty() {
            self.steps.push(step);
            self.steps.len() - 1
        } else {
            update_at_path(&mut self.steps, parent, |node| node.add_child(step))?
        };
        self.recompute_result();

        let mut path = parent.to_vec();
        path.push(index);
        Some(path)
    }

    /// Mutates the step at `path`, re-aggregating every ancestor and the outcome.
    pub(crate) fn update_step<R>(
        &mut self,
        path: &[usize],
        f: impl FnOnce(&mut TestStep) -> R,
    ) -> Option<R> {
        let out = update_at_path(&mut self.steps, path, f)?;
        self.recompute_result();
        Some(out)
    }

    pub(crate) fn step_at(&self, path: &[usize]) -> Option<&TestStep> {
        step_at_path(&self.steps, path)
    }

    fn recompute_result(&mut self) {
        let failure = self.failure_cause.as_ref().map(FailureCause::result);
        self.result = aggregate(
            self.steps
                .iter()
                .map(TestStep::result)
                .chain(failure)
                .chain(self.annotated_result),
        );
    }
}
