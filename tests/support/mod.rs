//! Shared helper for integration tests: fail fast instead of hanging CI on a deadlock.

use std::sync::{mpsc, Once};
use std::time::Duration;

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

static INIT_TRACING: Once = Once::new();

/// Installs a `tracing` subscriber controlled by `RUST_LOG`, once per test process. Handy when a
/// test is misbehaving and worker/scheduler debug logs need to be visible; a no-op otherwise.
#[allow(dead_code)]
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _unused = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[allow(dead_code)]
pub fn execute_or_abandon<F>(body: F)
where
    F: FnOnce() + Send + 'static,
{
    init_tracing();

    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        body();
        let _unused = tx.send(());
    });

    rx.recv_timeout(TEST_TIMEOUT)
        .expect("test did not complete within the timeout - likely a deadlock");
}
