//! Diagnostic logging.
//!
//! Log lines go to stderr through `tracing`; user-facing output (documents,
//! answers, ingest lines) is printed to stdout by the commands themselves.
//! `RUST_LOG` overrides the default filter.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,ragbox=info,ragbox_core=info";
const VERBOSE_FILTER: &str = "warn,ragbox=debug,ragbox_core=debug";

pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
