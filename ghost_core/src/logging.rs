//! Tracing setup shared by the engine's hosts.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging at INFO unless `RUST_LOG` says otherwise
pub fn init() {
    init_with_level("info")
}

/// Initialize logging with a specific default level
///
/// `RUST_LOG` still wins when set. Output is the compact formatter, so a
/// host printing a timeline to stdout keeps diagnostics on their own lines.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Verbosity flag count to a default level (0 = warn, 1 = info, 2 = debug, 3+ = trace)
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize logging for testing (captures logs for test output)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
