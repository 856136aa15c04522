//! Diagnostic logging setup
//!
//! Installs a `tracing` subscriber for the binary. Library code only emits
//! events; it never installs a subscriber itself. Output goes to stderr so
//! command output on stdout stays machine-readable.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber
///
/// `RUST_LOG` wins when set. Otherwise the level is `info`, or `debug` when
/// `verbose` is true. Calling this twice returns an error from the second call.
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let default_level = if verbose { "debug" } else { "info" };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true)
        .compact();

    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
