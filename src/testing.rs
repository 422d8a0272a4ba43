//! Test-only helper for running a closure with a hard wall-clock timeout.
//!
//! A scheduling bug in this crate (a missed notify, a lock taken in the wrong order) tends to
//! manifest as a test that blocks forever rather than one that fails - exactly the kind of failure
//! that silently hangs a CI run instead of reporting red. `execute_or_abandon` runs the closure on
//! a background thread and fails loudly if it doesn't finish in time.

use std::sync::mpsc;
use std::time::Duration;

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs `body` on a background thread and panics if it has not finished within
/// [`TEST_TIMEOUT`]. On timeout, the background thread is abandoned (it may still be running,
/// deadlocked) rather than forcibly killed - Rust has no safe thread-kill primitive - but the test
/// process fails fast instead of hanging.
#[allow(dead_code)]
pub(crate) fn execute_or_abandon<F>(body: F)
where
    F: FnOnce() + Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        body();
        let _unused = tx.send(());
    });

    rx.recv_timeout(TEST_TIMEOUT)
        .expect("test did not complete within the timeout - likely a deadlock");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_or_abandon_runs_body_to_completion() {
        let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let ran_clone = std::sync::Arc::clone(&ran);

        execute_or_abandon(move || {
            ran_clone.store(true, std::sync::atomic::Ordering::SeqCst);
        });

        assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    #[should_panic(expected = "did not complete within the timeout")]
    fn execute_or_abandon_panics_on_timeout() {
        execute_or_abandon_with_timeout(Duration::from_millis(50), || {
            std::thread::sleep(Duration::from_secs(60));
        });
    }

    fn execute_or_abandon_with_timeout<F>(timeout: Duration, body: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            body();
            let _unused = tx.send(());
        });
        rx.recv_timeout(timeout)
            .expect("test did not complete within the timeout - likely a deadlock");
    }
}
