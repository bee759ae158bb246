//! Subscriber setup for binaries and tests.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to whoever owns the process.

use switchboard_core::BoxError;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(true)
        .init();
}

/// Like [`init`], but reports an already installed subscriber as an error.
pub fn try_init() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(true)
        .try_init()
}
