//! Tracing setup for the command-line tool.
//!
//! The library itself only emits events through `tracing`; installing a
//! subscriber is left to the binary.

use tracing_subscriber::EnvFilter;

/// Filter used with `--verbose`: every line sent and received
pub const WIRE_FILTER: &str = "bzrc=trace";

/// Build the filter from `RUST_LOG`, falling back to `default`.
///
/// ```bash
/// RUST_LOG=debug bzrc query teams
/// RUST_LOG=bzrc::protocol=trace bzrc snapshot
/// ```
pub fn env_filter(default: &str) -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize the tracing subscriber on stderr.
///
/// Logs at INFO level and above unless `verbose` is set or `RUST_LOG` says
/// otherwise.
pub fn init_tracing(verbose: bool) {
	let default = if verbose { WIRE_FILTER } else { "info" };
	tracing_subscriber::fmt().with_env_filter(env_filter(default)).with_writer(std::io::stderr).init();
}

// vim: ts=4
