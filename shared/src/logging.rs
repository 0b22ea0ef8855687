//! Logging bootstrap.
//!
//! All crates log through `tracing`; the subscriber is installed once at
//! process startup and filtered through `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// Safe to call once per process; later calls are ignored so tests can share
/// a single subscriber.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
