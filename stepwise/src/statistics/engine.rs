//! Pass rate, stability and trend computation.

use super::snapshot::ratio;
use super::{HistoricalRun, HistoricalSnapshot, HistoryStore};
use crate::config::StatisticsConfig;
use crate::core::{StepCounts, TestOutcome};
use crate::utils::{Clock, SystemClock, Timestamp};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_BUILD_ID: &str = "local";

/// How stable a test has been recently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Stability {
    /// No history, or the store could not be reached.
    Unknown,
    /// Measured over `runs` recent runs.
    Measured {
        /// `1 - pass rate` over the stability window.
        flakiness: f64,
        /// Number of runs considered.
        runs: usize,
    },
}

impl Stability {
    /// The flakiness, if known.
    #[must_use]
    pub fn flakiness(&self) -> Option<f64> {
        match self {
            Self::Unknown => None,
            Self::Measured { flakiness, .. } => Some(*flakiness),
        }
    }
}

/// Direction of the pass rate over a window of snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// The pass rate went up by more than the tolerance.
    Improving,
    /// The pass rate went down by more than the tolerance.
    Declining,
    /// The pass rate moved by no more than the tolerance.
    Steady,
    /// Fewer than two snapshots.
    Unknown,
}

/// One point of a pass-rate trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// When the snapshot was sealed.
    pub timestamp: Timestamp,
    /// The snapshot's build.
    pub build_id: String,
    /// The snapshot's step pass rate.
    pub pass_rate: f64,
}

/// Pass rates over recent snapshots, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// The points, oldest first.
    pub points: Vec<TrendPoint>,
    /// Overall direction from the first point to the last.
    pub direction: TrendDirection,
}

/// Counts for one build. A build may be run by several contexts at once;
/// `open` tracks how many of them have begun it and not yet finished.
#[derive(Debug, Default)]
struct Batch {
    open: usize,
    counts: StepCounts,
    outcomes: usize,
}

/// Computes statistics over completed outcomes and their history.
///
/// Outcomes are batched by build id, which is the suite id of the outcome
/// (or `"local"` for outcomes recorded outside a suite). Each batch is sealed
/// into one [`HistoricalSnapshot`].
///
/// Historical figures are advisory: when the store fails, queries degrade to
/// `0.0` or [`Stability::Unknown`] and a warning is logged.
pub struct StatisticsEngine {
    store: Arc<dyn HistoryStore>,
    config: StatisticsConfig,
    clock: Arc<dyn Clock>,
    batches: Mutex<HashMap<String, Batch>>,
    history: RwLock<Vec<HistoricalSnapshot>>,
}

impl std::fmt::Debug for StatisticsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticsEngine")
            .field("config", &self.config)
            .field("batches", &self.batches.lock().len())
            .field("snapshots", &self.history.read().len())
            .finish_non_exhaustive()
    }
}

impl StatisticsEngine {
    /// Creates an engine over `store` with default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            config: StatisticsConfig::default(),
            clock: Arc::new(SystemClock),
            batches: Mutex::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: StatisticsConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the clock used to stamp snapshots.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    /// Opens the batch for `build_id`. Opening a build that is already open
    /// (another context running the same suite) joins it.
    pub fn begin_batch(&self, build_id: impl Into<String>) {
        self.batches.lock().entry(build_id.into()).or_default().open += 1;
    }

    /// Adds an outcome's leaf counts to the batch of its suite and records the
    /// run in the store.
    pub fn record_outcome(&self, outcome: &TestOutcome) {
        let build_id = outcome.suite().unwrap_or(DEFAULT_BUILD_ID);
        {
            let mut batches = self.batches.lock();
            let batch = batches.entry(build_id.to_string()).or_default();
            batch.counts.merge(&outcome.step_counts());
            batch.outcomes += 1;
        }

        let run = HistoricalRun::new(outcome.title(), outcome.result(), outcome.start_time())
            .with_duration_ms(outcome.duration_ms())
            .with_build_id(build_id);
        if let Err(err) = self.store.record_run(run) {
            warn!(test = outcome.title(), error = %err, "Could not record run in history store");
        }
    }

    /// Leaf counts accumulated so far in the batch for `build_id`.
    #[must_use]
    pub fn pending_counts(&self, build_id: &str) -> StepCounts {
        self.batches
            .lock()
            .get(build_id)
            .map(|batch| batch.counts)
            .unwrap_or_default()
    }

    /// Finishes one run of the batch for `build_id`.
    ///
    /// When the last context running the build finishes, the batch is sealed
    /// into a snapshot, appended to the local history and the store, and
    /// returned. Returns `None` while other contexts still run the build.
    pub fn complete_batch(&self, build_id: &str) -> Option<HistoricalSnapshot> {
        let batch = {
            let mut batches = self.batches.lock();
            match batches.get_mut(build_id) {
                Some(batch) if batch.open > 1 => {
                    batch.open -= 1;
                    return None;
                }
                _ => batches.remove(build_id).unwrap_or_default(),
            }
        };

        let snapshot = HistoricalSnapshot::from_counts(self.clock.now(), build_id, &batch.counts);
        {
            let mut history = self.history.write();
            history.push(snapshot.clone());
            let excess = history.len().saturating_sub(self.config.history_window);
            history.drain(..excess);
        }
        if let Err(err) = self.store.append(snapshot.clone()) {
            warn!(build = build_id, error = %err, "Could not append snapshot to history store");
        }
        debug!(
            build = build_id,
            outcomes = batch.outcomes,
            steps = snapshot.total_steps(),
            "Batch completed"
        );
        Some(snapshot)
    }

    /// The most recent `window` snapshots, oldest first. At most
    /// `history_window` snapshots are kept locally.
    #[must_use]
    pub fn history(&self, window: usize) -> Vec<HistoricalSnapshot> {
        let history = self.history.read();
        let skip = history.len().saturating_sub(window);
        history[skip..].to_vec()
    }

    /// Fraction of passing runs among the last `over_last_n` runs of
    /// `test_title`. Returns `0.0` when there is no history or the store
    /// cannot be reached.
    #[must_use]
    pub fn pass_rate(&self, test_title: &str, over_last_n: usize) -> f64 {
        self.recent_runs(test_title, over_last_n)
            .map_or(0.0, |runs| passing_ratio(&runs))
    }

    /// Pass rate over the configured long-term window.
    #[must_use]
    pub fn long_term_pass_rate(&self, test_title: &str) -> f64 {
        self.pass_rate(test_title, self.config.pass_rate_window)
    }

    /// `1 - pass rate` over the shorter stability window, biased toward
    /// recent regressions.
    #[must_use]
    pub fn stability(&self, test_title: &str) -> Stability {
        match self.recent_runs(test_title, self.config.stability_window) {
            Some(runs) if !runs.is_empty() => Stability::Measured {
                flakiness: 1.0 - passing_ratio(&runs),
                runs: runs.len(),
            },
            _ => Stability::Unknown,
        }
    }

    /// Step pass rates over the last `window` snapshots.
    #[must_use]
    pub fn trend(&self, window: usize) -> Trend {
        let points: Vec<TrendPoint> = self
            .history(window)
            .into_iter()
            .map(|snapshot| TrendPoint {
                timestamp: snapshot.timestamp(),
                build_id: snapshot.build_id().to_string(),
                pass_rate: snapshot.pass_rate(),
            })
            .collect();

        let direction = match (points.first(), points.last()) {
            (Some(first), Some(last)) if points.len() >= 2 => {
                let delta = last.pass_rate - first.pass_rate;
                if delta.abs() <= self.config.trend_tolerance {
                    TrendDirection::Steady
                } else if delta > 0.0 {
                    TrendDirection::Improving
                } else {
                    TrendDirection::Declining
                }
            }
            _ => TrendDirection::Unknown,
        };

        Trend { points, direction }
    }

    /// `None` when the store failed; an empty vector when there is no history.
    fn recent_runs(&self, test_title: &str, limit: usize) -> Option<Vec<HistoricalRun>> {
        if limit == 0 {
            return Some(Vec::new());
        }
        match self.store.query(test_title, limit) {
            Ok(runs) => Some(runs),
            Err(err) => {
                warn!(test = test_title, error = %err, "History unavailable; statistics degraded");
                None
            }
        }
    }
}

fn passing_ratio(runs: &[HistoricalRun]) -> f64 {
    ratio(runs.iter().filter(|run| run.passed()).count(), runs.len())
}
