//! Logging setup for hosts embedding the engine.
//!
//! The engine itself only emits `tracing` events:
//! - `debug` per-frame counters from the frame driver
//! - `info` engine lifecycle
//! - `warn` recoverable fetch failures
//!
//! Hosts with their own subscriber need nothing from this module.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. `"info"` or
/// `"tilestream=debug"`) is used. Fails without side effects if a global
/// subscriber is already installed, so calling it twice is harmless.
pub fn init_logging(default_directive: &str) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
}
