//! History records.

use crate::core::{StepCounts, TestResult};
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};

/// Step counts for one batch of outcomes (typically one CI build).
///
/// Snapshots are created once by the statistics engine and never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalSnapshot {
    timestamp: Timestamp,
    total_steps: usize,
    passing_steps: usize,
    failing_steps: usize,
    skipped_steps: usize,
    build_id: String,
}

impl HistoricalSnapshot {
    /// Creates a snapshot from leaf step counts.
    ///
    /// Errors count as failing; ignored and pending steps count as skipped.
    #[must_use]
    pub fn from_counts(timestamp: Timestamp, build_id: impl Into<String>, counts: &StepCounts) -> Self {
        Self {
            timestamp,
            total_steps: counts.total(),
            passing_steps: counts.passing,
            failing_steps: counts.failing_or_error(),
            skipped_steps: counts.not_executed(),
            build_id: build_id.into(),
        }
    }

    /// When the batch was sealed.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// All leaf steps in the batch.
    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Leaf steps that passed.
    #[must_use]
    pub fn passing_steps(&self) -> usize {
        self.passing_steps
    }

    /// Leaf steps that failed or errored.
    #[must_use]
    pub fn failing_steps(&self) -> usize {
        self.failing_steps
    }

    /// Leaf steps that did not execute.
    #[must_use]
    pub fn skipped_steps(&self) -> usize {
        self.skipped_steps
    }

    /// The build the batch belongs to.
    #[must_use]
    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    /// Fraction of passing steps, `0.0` for an empty batch.
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        ratio(self.passing_steps, self.total_steps)
    }
}

/// One past execution of a test, as kept by a history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRun {
    /// The test title.
    pub title: String,
    /// The run's result.
    pub result: TestResult,
    /// When the run started.
    pub timestamp: Timestamp,
    /// The build the run belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    /// Wall-clock duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

impl HistoricalRun {
    /// Creates a run record.
    #[must_use]
    pub fn new(title: impl Into<String>, result: TestResult, timestamp: Timestamp) -> Self {
        Self {
            title: title.into(),
            result,
            timestamp,
            build_id: None,
            duration_ms: 0,
        }
    }

    /// Sets the build id.
    #[must_use]
    pub fn with_build_id(mut self, build_id: impl Into<String>) -> Self {
        self.build_id = Some(build_id.into());
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Returns true if the run passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.result.is_success()
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
