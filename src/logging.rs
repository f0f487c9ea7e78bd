//! Tracing setup for the command-line tool.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding an `EnvFilter` directive, e.g. `podorders=debug`.
pub const LOG_ENV: &str = "PODORDERS_LOG";

static INIT: Once = Once::new();

/// Default filter for a `-v` count: warnings, then info, then debug.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "podorders=warn",
        1 => "podorders=info",
        _ => "podorders=debug",
    }
}

/// Installs a stderr subscriber. `PODORDERS_LOG` wins over `verbosity`.
///
/// Only the first call has any effect.
pub fn init_logging(verbosity: u8, ansi: bool) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(ansi),
            )
            .with(filter)
            .init();
    });
}
