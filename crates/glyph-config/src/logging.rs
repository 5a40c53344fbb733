use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber for hosts that don't bring their
/// own: `RUST_LOG`-style env filtering over a compact fmt layer.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
    if result.is_err() {
        // A subscriber is already installed (embedding host or a test
        // harness); keep it.
        tracing::debug!(target = "glyph.config", "tracing subscriber already set");
    }
}
