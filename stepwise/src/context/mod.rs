//! Execution context isolation.
//!
//! This module provides:
//! - Opaque context keys supplied by test runners
//! - Execution contexts, each owning one event bus and its in-flight outcome
//! - A process-wide registry that hands contexts out by key

mod execution;
mod key;
mod registry;

pub use execution::ExecutionContext;
pub use key::ContextKey;
pub use registry::ContextRegistry;
