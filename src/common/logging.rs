//! Logging and tracing configuration
//!
//! Logs always go to stderr so they never interleave with the test report,
//! which is written to stdout.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable. Without it the
/// level follows the number of `-v` flags: warn, then debug, then trace.
pub fn init_cli(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbosity {
            0 => "marcus=warn",
            1 => "marcus=debug,warn",
            _ => "marcus=trace,info",
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
