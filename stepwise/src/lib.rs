//! # Stepwise
//!
//! The run-time core of a test-execution reporting engine.
//!
//! Test runners push lifecycle events (suite started, test started, step
//! started/finished/failed, test finished, ...) into a per-context event bus.
//! Stepwise turns them into a tree of results with:
//!
//! - **Outcome model**: tests, nested steps, tags and failure causes
//! - **Result aggregation**: a fixed precedence with durations summed up the tree
//! - **Event bus**: a checked lifecycle state machine with listener fan-out
//! - **Context isolation**: one bus per thread or worker, looked up by key
//! - **Statistics**: pass rate, stability and trend over historical runs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stepwise::prelude::*;
//!
//! let registry = ContextRegistry::new();
//! registry.register_listener(CollectingListener::shared());
//!
//! let context = registry.resolve(&ContextKey::named("worker-1"));
//! let mut bus = context.bus();
//! bus.test_started("login_with_valid_user", Vec::new())?;
//! bus.step_started("open the login page")?;
//! bus.step_finished()?;
//! let outcome = bus.test_finished()?;
//! assert_eq!(outcome.result(), TestResult::Success);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod statistics;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{BusConfig, StatisticsConfig, StepwiseConfig};
    pub use crate::context::{ContextKey, ContextRegistry, ExecutionContext};
    pub use crate::core::{
        aggregate, FailureCause, FailureKind, StepKind, Tag, TagProvider, TestOutcome,
        TestResult, TestStep,
    };
    pub use crate::errors::{
        ConfigError, HistoryError, ListenerFailure, ProtocolViolationError, StepwiseError,
    };
    pub use crate::events::{
        BusState, CollectingListener, LifecycleEvent, LoggingListener, StepEventBus,
        StepListener,
    };
    pub use crate::statistics::{
        HistoryStore, InMemoryHistoryStore, Stability, StatisticsEngine, StatisticsListener,
    };
    pub use crate::utils::{Clock, SystemClock, Timestamp};
}
