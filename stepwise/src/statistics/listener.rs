//! Feeds completed outcomes into a statistics engine.

use super::StatisticsEngine;
use crate::core::TestOutcome;
use crate::events::StepListener;
use std::sync::Arc;

/// A listener that records every completed outcome.
///
/// Each suite becomes one batch named after the suite id; the batch is sealed
/// into a snapshot when the suite finishes. One listener can be shared by
/// every context of a registry: suites running side by side keep separate
/// batches.
#[derive(Debug, Clone)]
pub struct StatisticsListener {
    engine: Arc<StatisticsEngine>,
}

impl StatisticsListener {
    /// Creates a listener feeding `engine`.
    #[must_use]
    pub fn new(engine: Arc<StatisticsEngine>) -> Self {
        Self { engine }
    }

    /// The engine being fed.
    #[must_use]
    pub fn engine(&self) -> &Arc<StatisticsEngine> {
        &self.engine
    }
}

impl StepListener for StatisticsListener {
    fn name(&self) -> &str {
        "statistics"
    }

    fn test_suite_started(&self, suite_id: &str) -> anyhow::Result<()> {
        self.engine.begin_batch(suite_id);
        Ok(())
    }

    fn outcome_ready(&self, outcome: &TestOutcome) -> anyhow::Result<()> {
        self.engine.record_outcome(outcome);
        Ok(())
    }

    fn test_suite_finished(&self, suite_id: &str) -> anyhow::Result<()> {
        self.engine.complete_batch(suite_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TestResult;
    use crate::events::StepEventBus;
    use crate::statistics::{HistoryStore, InMemoryHistoryStore};

    #[test]
    fn test_suite_becomes_snapshot() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let engine = Arc::new(StatisticsEngine::new(store.clone()));
        let mut bus = StepEventBus::new("stats");
        bus.register_listener(Arc::new(StatisticsListener::new(engine.clone())));

        bus.test_suite_started("nightly").unwrap();
        bus.test_started("login", Vec::new()).unwrap();
        bus.step_started("open page").unwrap();
        bus.step_finished().unwrap();
        bus.test_finished().unwrap();
        bus.test_suite_finished().unwrap();

        let history = engine.history(5);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].build_id(), "nightly");
        assert_eq!(history[0].passing_steps(), 1);
        assert_eq!(store.run_count(), 1);
        assert_eq!(engine.pass_rate("Login", 5), 1.0);
        assert_eq!(
            store.query("Login", 1).unwrap()[0].result,
            TestResult::Success
        );
    }

    #[test]
    fn test_interleaved_suites_on_two_buses() {
        let engine = Arc::new(StatisticsEngine::new(Arc::new(InMemoryHistoryStore::new())));
        let listener = Arc::new(StatisticsListener::new(engine.clone()));
        let mut a = StepEventBus::new("a");
        let mut b = StepEventBus::new("b");
        a.register_listener(listener.clone());
        b.register_listener(listener);

        a.test_suite_started("suite-a").unwrap();
        b.test_suite_started("suite-b").unwrap();
        a.test_started("one", Vec::new()).unwrap();
        b.test_started("two", Vec::new()).unwrap();
        a.step_started("a1").unwrap();
        b.step_started("b1").unwrap();
        a.step_finished().unwrap();
        b.step_finished().unwrap();
        b.step_started("b2").unwrap();
        b.step_finished().unwrap();
        a.test_finished().unwrap();
        b.test_finished().unwrap();
        a.test_suite_finished().unwrap();

        let first = engine.history(5);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].build_id(), "suite-a");
        assert_eq!(first[0].total_steps(), 1);
        assert_eq!(engine.pending_counts("suite-b").total(), 2);

        b.test_suite_finished().unwrap();
        let history = engine.history(5);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].build_id(), "suite-b");
        assert_eq!(history[1].total_steps(), 2);
    }
}
