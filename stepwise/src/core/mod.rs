//! Core outcome model for stepwise.
//!
//! This module contains the result tree built while a test runs:
//! - The `TestResult` enum and its aggregation precedence
//! - Leaf and group steps
//! - Test outcomes, tags and failure causes

mod aggregate;
mod failure;
mod outcome;
mod result;
mod step;
mod tag;

pub use aggregate::{aggregate, aggregate_duration, StepCounts};
pub use failure::{FailureCause, FailureKind};
pub use outcome::TestOutcome;
pub use result::TestResult;
pub use step::{StepKind, TestStep};
pub use tag::{collect_tags, StaticTagProvider, Tag, TagProvider, TestIdentity};
