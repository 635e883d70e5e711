//! Diagnostics for debugging a release.
//!
//! User-facing progress is printed to stdout by the commands. This module
//! only sets up `tracing`: filter from `RUST_LOG` (default `warn`), compact
//! output to stderr.
//!
//! ```bash
//! RUST_LOG=apm_release=debug apm-release run --dry-run
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber. Call once, from `main`.
pub fn init() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(std::io::stderr).compact())
    .init();
}
