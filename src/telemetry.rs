//! Tracing subscriber setup for binaries.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! the binary's job so hosts keep control of their own logging pipeline.

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber filtered by `RUST_LOG`, falling back to the
/// given directive (default `info`). Safe to call more than once; later calls
/// are no-ops.
pub fn init_tracing(default_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.unwrap_or("info")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
