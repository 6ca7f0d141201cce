//! Lifecycle event routing.
//!
//! This module provides the per-context [`StepEventBus`], the notifications it
//! emits, and the [`StepListener`] capability through which report writers,
//! statistics recorders and loggers observe a run.

mod bus;
mod event;
mod listener;

pub use bus::{BusState, StepEventBus};
pub use event::LifecycleEvent;
pub use listener::{CollectingListener, LoggingListener, NoOpListener, StepListener};
