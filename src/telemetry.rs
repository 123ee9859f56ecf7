//! Log output for the harness
//!
//! Human-readable `fmt` output filtered by `RUST_LOG`, `info` by default.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber; fails if one is already installed
pub fn try_init() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
}

/// Install the global subscriber unless one is already installed. Test
/// binaries call this from every test.
pub fn init() {
    let _ = try_init();
}
