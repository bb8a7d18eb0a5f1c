//! Diagnostic tracing for the orchestrator.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: cycle milestones and skipped items via
//!   `RUST_LOG`, output to stderr.
//!
//! - **Reports (`stages::printer`)**: the test report on stdout. Never mixed
//!   with tracing output so `--json` consumers can read stdout line by line.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` env var. Defaults to `scantest=info` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=scantest=debug scantest
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scantest=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
