//
// logging.rs
// Nifti-Tools-rs
//
// tracing-subscriber setup; logs go to stderr so they do not mix with the result tables.
//

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
///
/// The default level is `warn` so per-file log lines do not tear the progress bar.
pub fn init(verbose: bool, json_format: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_names(verbose)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
