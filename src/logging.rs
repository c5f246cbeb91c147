//! Logging Setup
//!
//! One global `tracing` subscriber: env filter, console output on native
//! targets, and the rolling buffer a diagnostics panel reads from.

use rolling_logger::{RollingBuffer, DEFAULT_CAPACITY};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "board_sync=info";

/// Install the subscriber and return the buffer handle
///
/// A second call leaves the first subscriber in place; the returned buffer
/// then receives nothing.
pub fn init_logging(default_filter: &str) -> RollingBuffer {
    init_logging_with_capacity(default_filter, DEFAULT_CAPACITY)
}

pub fn init_logging_with_capacity(default_filter: &str, capacity: usize) -> RollingBuffer {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let buffer = RollingBuffer::new(capacity);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // stdout goes nowhere in the browser
    let console = (!cfg!(target_arch = "wasm32")).then(|| tracing_subscriber::fmt::layer().with_target(true));

    if tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(buffer.layer())
        .try_init()
        .is_err()
    {
        tracing::debug!("logging already initialized");
    }
    buffer
}
