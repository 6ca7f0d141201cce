//! The historical-run store collaborator.

use super::{HistoricalRun, HistoricalSnapshot};
use crate::errors::HistoryError;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Persistence for snapshots and past runs.
///
/// The storage mechanism is up to the implementor; the statistics engine only
/// needs these operations.
pub trait HistoryStore: Send + Sync {
    /// Appends a sealed batch snapshot.
    fn append(&self, snapshot: HistoricalSnapshot) -> Result<(), HistoryError>;

    /// Records one run of a test.
    fn record_run(&self, run: HistoricalRun) -> Result<(), HistoryError>;

    /// Returns up to `limit` runs of `test_title`, most recent first.
    fn query(&self, test_title: &str, limit: usize) -> Result<Vec<HistoricalRun>, HistoryError>;
}

/// A store that keeps everything in memory.
#[derive(Debug)]
pub struct InMemoryHistoryStore {
    runs: RwLock<Vec<HistoricalRun>>,
    snapshots: RwLock<Vec<HistoricalSnapshot>>,
    available: AtomicBool,
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self {
            runs: RwLock::new(Vec::new()),
            snapshots: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with runs.
    #[must_use]
    pub fn with_runs(runs: impl IntoIterator<Item = HistoricalRun>) -> Self {
        let store = Self::new();
        store.runs.write().extend(runs);
        store
    }

    /// Makes every operation fail with `HistoryError::Unavailable` until
    /// switched back on.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Snapshots appended so far, in append order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<HistoricalSnapshot> {
        self.snapshots.read().clone()
    }

    /// Number of stored runs.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.read().len()
    }

    fn check_available(&self) -> Result<(), HistoryError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(HistoryError::unavailable("in-memory store switched off"))
        }
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn append(&self, snapshot: HistoricalSnapshot) -> Result<(), HistoryError> {
        self.check_available()?;
        self.snapshots.write().push(snapshot);
        Ok(())
    }

    fn record_run(&self, run: HistoricalRun) -> Result<(), HistoryError> {
        self.check_available()?;
        self.runs.write().push(run);
        Ok(())
    }

    fn query(&self, test_title: &str, limit: usize) -> Result<Vec<HistoricalRun>, HistoryError> {
        self.check_available()?;
        let mut matching: Vec<HistoricalRun> = self
            .runs
            .read()
            .iter()
            .filter(|run| run.title == test_title)
            .cloned()
            .collect();
        // Stable sort, then reverse: later inserts win ties.
        matching.sort_by_key(|run| run.timestamp);
        matching.reverse();
        matching.truncate(limit);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TestResult;
    use crate::utils::now_utc;
    use chrono::Duration;

    #[test]
    fn test_query_returns_most_recent_first() {
        let start = now_utc();
        let store = InMemoryHistoryStore::with_runs((0..5).map(|i| {
            HistoricalRun::new("Login", TestResult::Success, start + Duration::minutes(i))
                .with_build_id(format!("b{i}"))
        }));

        let runs = store.query("Login", 2).unwrap();
        let builds: Vec<_> = runs.iter().filter_map(|r| r.build_id.as_deref()).collect();
        assert_eq!(builds, vec!["b4", "b3"]);
    }

    #[test]
    fn test_query_filters_by_title() {
        let store = InMemoryHistoryStore::new();
        store
            .record_run(HistoricalRun::new("Login", TestResult::Success, now_utc()))
            .unwrap();
        store
            .record_run(HistoricalRun::new("Logout", TestResult::Failure, now_utc()))
            .unwrap();

        assert_eq!(store.query("Login", 10).unwrap().len(), 1);
        assert!(store.query("Unknown", 10).unwrap().is_empty());
    }

    #[test]
    fn test_unavailable_store() {
        let store = InMemoryHistoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.query("Login", 5),
            Err(HistoryError::Unavailable { .. })
        ));

        store.set_available(true);
        assert!(store.query("Login", 5).is_ok());
    }
}
