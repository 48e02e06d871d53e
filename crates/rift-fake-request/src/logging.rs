//! Tracing setup for test binaries that want to see dispatch logs.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber writing through the test harness capture.
///
/// `RUST_LOG` wins over `default_filter`. Safe to call from every test:
/// only the first call installs anything.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .try_init();
}

