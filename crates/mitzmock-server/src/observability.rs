// Basic tracing initialization with a configurable log level.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the global subscriber. `RUST_LOG` wins over the configured
/// level so ad hoc debugging needs no config change.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
