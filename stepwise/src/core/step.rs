//! Nodes of the result tree.

use super::{aggregate, aggregate_duration, FailureCause, TestResult};
use crate::utils::{elapsed_ms, Timestamp};
use serde::{Deserialize, Serialize};

/// Whether a step is a plain action or a container of nested steps.
///
/// A step starts life as a `Leaf` and is promoted to a `Group` in place the
/// first time a child is recorded under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// An executed action.
    Leaf,
    /// A named step with nested steps.
    Group {
        /// The nested steps, in execution order.
        children: Vec<TestStep>,
    },
}

/// One recorded unit of test execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    description: String,
    result: TestResult,
    start_time: Timestamp,
    duration_ms: u64,
    /// The terminal signal delivered for this step itself, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seal: Option<TestResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<FailureCause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    screenshots: Vec<String>,
    #[serde(flatten)]
    kind: StepKind,
}

impl TestStep {
    /// Creates an open leaf step. Its result stays `Unspecified` until sealed.
    #[must_use]
    pub fn new(description: impl Into<String>, start_time: Timestamp) -> Self {
        Self {
            description: description.into(),
            result: TestResult::Unspecified,
            start_time,
            duration_ms: 0,
            seal: None,
            failure: None,
            screenshots: Vec::new(),
            kind: StepKind::Leaf,
        }
    }

    /// Creates an already-sealed leaf step.
    #[must_use]
    pub fn leaf(
        description: impl Into<String>,
        result: TestResult,
        start_time: Timestamp,
        duration_ms: u64,
    ) -> Self {
        Self {
            result,
            duration_ms,
            seal: Some(result),
            ..Self::new(description, start_time)
        }
    }

    /// Creates a group step from existing children.
    ///
    /// The group's result and duration are derived from `children`. A group
    /// with no children is `Success` with zero duration.
    #[must_use]
    pub fn group(
        description: impl Into<String>,
        start_time: Timestamp,
        children: Vec<TestStep>,
    ) -> Self {
        let mut step = Self {
            kind: StepKind::Group { children },
            ..Self::new(description, start_time)
        };
        step.reaggregate();
        step
    }

    /// Human-readable description of the step.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The step's result (aggregated for groups).
    #[must_use]
    pub fn result(&self) -> TestResult {
        self.result
    }

    /// When the step started.
    #[must_use]
    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    /// Duration in milliseconds (summed over children for groups).
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// The failure recorded against this step, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&FailureCause> {
        self.failure.as_ref()
    }

    /// Screenshot references attached to this step.
    #[must_use]
    pub fn screenshots(&self) -> &[String] {
        &self.screenshots
    }

    /// The leaf/group variant.
    #[must_use]
    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    /// Nested steps; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[TestStep] {
        match &self.kind {
            StepKind::Leaf => &[],
            StepKind::Group { children } => children,
        }
    }

    /// Returns true if the step holds nested steps.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self.kind, StepKind::Group { .. })
    }

    /// Returns true once a terminal event has been delivered for this step.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.seal.is_some()
    }

    /// Collects the leaves under this step, depth first.
    pub fn leaves(&self) -> Vec<&TestStep> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a TestStep>) {
        match &self.kind {
            StepKind::Leaf => out.push(self),
            StepKind::Group { children } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Appends a child, promoting a leaf to a group. Returns the child's index.
    pub(crate) fn add_child(&mut self, child: TestStep) -> usize {
        match &mut self.kind {
            StepKind::Group { children } => {
                children.push(child);
                children.len() - 1
            }
            StepKind::Leaf => {
                self.kind = StepKind::Group {
                    children: vec![child],
                };
                0
            }
        }
    }

    /// Records the terminal signal for this step.
    ///
    /// Leaves take their duration from the wall clock; groups keep the sum of
    /// their children.
    pub(crate) fn seal(&mut self, result: TestResult, end_time: Timestamp) {
        self.seal = Some(result);
        if !self.is_group() {
            self.duration_ms = elapsed_ms(self.start_time, end_time);
        }
    }

    pub(crate) fn seal_with_failure(&mut self, cause: FailureCause, end_time: Timestamp) {
        let result = cause.result();
        self.failure = Some(cause);
        self.seal(result, end_time);
    }

    pub(crate) fn add_screenshot(&mut self, reference: String) {
        self.screenshots.push(reference);
    }

    /// Recomputes the derived result and duration from the seal and children.
    ///
    /// A group's own seal is one more input to the aggregation, so a group that
    /// failed itself is not masked by passing children, while a plain
    /// `Success` seal can never raise the aggregate.
    pub(crate) fn reaggregate(&mut self) {
        match &self.kind {
            StepKind::Leaf => {
                self.result = self.seal.unwrap_or(TestResult::Unspecified);
            }
            StepKind::Group { children } => {
                self.result = aggregate(children.iter().map(Self::result).chain(self.seal));
                self.duration_ms = aggregate_duration(children.iter().map(Self::duration_ms));
            }
        }
    }
}

/// Applies `f` to the step addressed by `path` (child indices from the top
/// level) and re-aggregates every ancestor on the way back up.
///
/// Returns `None` if the path does not address a step.
pub(crate) fn update_at_path<R>(
    steps: &mut [TestStep],
    path: &[usize],
    f: impl FnOnce(&mut TestStep) -> R,
) -> Option<R> {
    let (first, rest) = path.split_first()?;
    let step = steps.get_mut(*first)?;
    let out = if rest.is_empty() {
        f(step)
    } else {
        let StepKind::Group { children } = &mut step.kind else {
            return None;
        };
        update_at_path(children, rest, f)?
    };
    step.reaggregate();
    Some(out)
}

/// Returns the step addressed by `path`.
pub(crate) fn step_at_path<'a>(steps: &'a [TestStep], path: &[usize]) -> Option<&'a TestStep> {
    let (first, rest) = path.split_first()?;
    let step = steps.get(*first)?;
    if rest.is_empty() {
        Some(step)
    } else {
        step_at_path(step.children(), rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::now_utc;
    use chrono::Duration;

    #[test]
    fn test_new_step_is_open_leaf() {
        let step = TestStep::new("open the login page", now_utc());
        assert!(!step.is_group());
        assert!(!step.is_sealed());
        assert_eq!(step.result(), TestResult::Unspecified);
    }

    #[test]
    fn test_seal_measures_leaf_duration() {
        let start = now_utc();
        let mut step = TestStep::new("submit", start);
        step.seal(TestResult::Success, start + Duration::milliseconds(120));
        step.reaggregate();

        assert_eq!(step.result(), TestResult::Success);
        assert_eq!(step.duration_ms(), 120);
    }

    #[test]
    fn test_add_child_promotes_leaf() {
        let start = now_utc();
        let mut step = TestStep::new("checkout", start);
        let index = step.add_child(TestStep::leaf("pay", TestResult::Success, start, 40));
        step.reaggregate();

        assert_eq!(index, 0);
        assert!(step.is_group());
        assert_eq!(step.children().len(), 1);
        assert_eq!(step.duration_ms(), 40);
    }

    #[test]
    fn test_empty_group_is_success() {
        let group = TestStep::group("nothing ran", now_utc(), Vec::new());
        assert_eq!(group.result(), TestResult::Success);
        assert_eq!(group.duration_ms(), 0);
    }

    #[test]
    fn test_group_own_failure_is_not_masked() {
        let start = now_utc();
        let mut group = TestStep::group(
            "checkout",
            start,
            vec![TestStep::leaf("pay", TestResult::Success, start, 5)],
        );
        group.seal_with_failure(FailureCause::assertion("total mismatch"), start);
        group.reaggregate();

        assert_eq!(group.result(), TestResult::Failure);
        assert_eq!(group.failure().unwrap().message, "total mismatch");
    }

    #[test]
    fn test_update_at_path_reaggregates_ancestors() {
        let start = now_utc();
        let mut steps = vec![TestStep::group(
            "outer",
            start,
            vec![TestStep::group(
                "inner",
                start,
                vec![TestStep::new("leaf", start)],
            )],
        )];

        update_at_path(&mut steps, &[0, 0, 0], |s| {
            s.seal(TestResult::Error, start + Duration::milliseconds(30));
        })
        .unwrap();

        assert_eq!(steps[0].result(), TestResult::Error);
        assert_eq!(steps[0].duration_ms(), 30);
        assert_eq!(steps[0].children()[0].result(), TestResult::Error);
    }

    #[test]
    fn test_update_at_bad_path() {
        let mut steps = vec![TestStep::new("only", now_utc())];
        assert!(update_at_path(&mut steps, &[3], |_| ()).is_none());
        assert!(update_at_path(&mut steps, &[0, 0], |_| ()).is_none());
        assert!(update_at_path(&mut steps, &[], |_| ()).is_none());
    }

    #[test]
    fn test_step_at_path() {
        let start = now_utc();
        let steps = vec![TestStep::group(
            "outer",
            start,
            vec![TestStep::leaf("a", TestResult::Success, start, 1)],
        )];
        assert_eq!(step_at_path(&steps, &[0, 0]).unwrap().description(), "a");
        assert!(step_at_path(&steps, &[0, 1]).is_none());
    }

    #[test]
    fn test_leaves_depth_first() {
        let start = now_utc();
        let step = TestStep::group(
            "outer",
            start,
            vec![
                TestStep::leaf("a", TestResult::Success, start, 1),
                TestStep::group(
                    "inner",
                    start,
                    vec![TestStep::leaf("b", TestResult::Success, start, 1)],
                ),
                TestStep::leaf("c", TestResult::Success, start, 1),
            ],
        );
        let names: Vec<_> = step.leaves().iter().map(|s| s.description()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
