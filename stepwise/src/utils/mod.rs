//! Utility functions for timestamps, clocks and title formatting.

mod clock;
pub mod timestamps;
mod titles;

pub use clock::{Clock, ManualClock, SystemClock};
pub use timestamps::{elapsed_ms, now_utc, Timestamp};
pub use titles::humanize;

