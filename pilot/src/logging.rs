//! Development-time tracing for the orchestrator and CLI.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. Command output
//! (encoded messages, status JSON, simulation reports) goes to stdout and is
//! unaffected by the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=pilot=debug pilot simulate pilot/scenarios/safe_goto.toml
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Err(err) = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init()
    {
        tracing::debug!(error = %err, "tracing subscriber already installed");
    }
}
