use std::sync::Once;

static LOGGING_INIT: Once = Once::new();

/// Installs a tracing subscriber that writes through the test harness.
///
/// Guarded by a `Once`, so parallel tests can all call it; the filter comes
/// from `RUST_LOG`.
pub fn setup_test_logging() {
    LOGGING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok(); // Another subscriber may already be installed.
    });
}

/// Returns true when the current process runs as root (UID 0), where
/// permission-based tests cannot lock anything out.
#[cfg(any(test, doctest))]
#[inline]
pub fn running_as_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no side effects.
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
