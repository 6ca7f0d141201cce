//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events. Binaries and test harnesses
//! that want to see them call one of the initializers below once at startup.
//! Enable output with `RUST_LOG=stepwise=debug`.

use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TRACING_INIT: Once = Once::new();

/// Installs a human-readable subscriber.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        if let Some(filter) = env_filter() {
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}

/// Installs a subscriber that writes one JSON object per event.
///
/// Shares the guard with [`init_tracing`]: whichever runs first wins.
pub fn init_tracing_json() {
    TRACING_INIT.call_once(|| {
        if let Some(filter) = env_filter() {
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().json().with_current_span(false))
                .with(filter)
                .try_init();
        }
    });
}

fn env_filter() -> Option<EnvFilter> {
    // Only initialize if RUST_LOG is set
    std::env::var("RUST_LOG")
        .is_ok()
        .then(EnvFilter::from_default_env)
}
