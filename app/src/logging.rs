use tracing_subscriber::EnvFilter;

use crate::config::LOG_ENV;

/// Install a `tracing` subscriber that writes through the test harness's
/// captured output. The filter comes from `SHMOCK_LOG` (for example
/// `SHMOCK_LOG=shmock=debug`) and defaults to `warn`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
