//! Tracing subscriber setup for applications embedding the codec.
//!
//! The library itself only emits `tracing` events. No plaintext, key material
//! or MAC secret is ever recorded; key ids and contexts are.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install a JSON `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `log_level` when set.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise tracing subscriber: {e}"))
}
