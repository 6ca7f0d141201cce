//! Historical statistics over completed outcomes.
//!
//! This module provides:
//! - Immutable per-batch snapshots and per-run history records
//! - The `HistoryStore` collaborator interface and an in-memory store
//! - The statistics engine (pass rate, stability, trend)
//! - Roll-up summaries of a set of outcomes

mod engine;
mod listener;
mod snapshot;
mod store;
mod summary;

pub use engine::{Stability, StatisticsEngine, Trend, TrendDirection, TrendPoint};
pub use listener::StatisticsListener;
pub use snapshot::{HistoricalRun, HistoricalSnapshot};
pub use store::{HistoryStore, InMemoryHistoryStore};
pub use summary::OutcomeSummary;
