//! Diagnostic logging setup

use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `RUST_LOG` wins when set. Otherwise only warnings are shown, or crate debug
/// output when `verbose` is on. Logs go to stderr so they never mix with the
/// stage banners on stdout.
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "warn,flutterpatch=debug"
    } else {
        "warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
