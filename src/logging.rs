//! Log output for the `stratus` binary.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter applied when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Builds the log filter from `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`].
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs a formatting subscriber writing to stderr, keeping stdout for
/// command output. Later calls are ignored.
pub fn init() {
    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(env_filter())
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
