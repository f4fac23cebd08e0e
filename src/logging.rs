use tracing_subscriber::{EnvFilter, fmt};

/// Installs the fmt subscriber, filtered by `RUST_LOG` (default `info`).
/// Calling it again is a no-op.
pub fn init() {
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .try_init();
}
