//! Testing utilities for code that drives or listens to an event bus.
//!
//! This module provides:
//! - Listeners that collect, fail or panic on demand
//! - A scripted driver for replaying event sequences
//! - Assertions over produced outcomes

mod assertions;
mod mocks;
mod script;

pub use crate::events::CollectingListener;
pub use assertions::{
    assert_has_tag, assert_outcome_failed, assert_outcome_result, assert_outcome_succeeded,
    assert_step_results, assert_warning_contains,
};
pub use mocks::{CountingListener, FailingListener, PanickingListener};
pub use script::{EventScript, ScriptAction};
