use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::constants::ERR_POISONED_LOCK;
use crate::exec::execute_guarded;
use crate::future::SharedFuture;

use super::shared::PoolShared;

/// One OS thread owned by the pool, plus the bookkeeping needed to stop and join it.
pub(crate) struct Worker {
    stop: Arc<AtomicBool>,
    completion: SharedFuture<()>,
    handle: Option<JoinHandle<()>>,
}

static NEXT_WORKER_ID: AtomicUsize = AtomicUsize::new(0);

impl Worker {
    /// Spawns a new worker thread running the pool's worker loop. Returns an error, without
    /// having mutated any shared state, if the operating system refuses to hand out a thread.
    pub(crate) fn spawn(shared: &Arc<PoolShared>) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let (promise, completion) = SharedFuture::pair();

        let thread_stop = Arc::clone(&stop);
        let thread_shared = Arc::clone(shared);
        let worker_id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{worker_id}", shared.thread_name_prefix);

        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                tracing::debug!(worker = %name, "worker thread starting");
                run_loop(&thread_shared, &thread_stop);
                tracing::debug!(worker = %name, "worker thread stopping");
                promise.set(());
            })?;

        Ok(Self {
            stop,
            completion,
            handle: Some(handle),
        })
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub(crate) fn completion(&self) -> SharedFuture<()> {
        self.completion.clone()
    }

    /// Blocks until the worker's thread function has returned, then joins its OS thread. Safe to
    /// call more than once; the second call is a no-op.
    pub(crate) fn join(&mut self) {
        self.completion.wait();

        if let Some(handle) = self.handle.take() {
            // A worker's thread function never panics past `execute_guarded`, so a join failure
            // here would itself be an invariant violation worth surfacing loudly rather than
            // swallowing.
            handle.join().expect("worker thread panicked past its panic boundary");
        }
    }
}

fn run_loop(shared: &Arc<PoolShared>, stop: &AtomicBool) {
    let mut state = shared.state.lock().expect(ERR_POISONED_LOCK);

    loop {
        if stop.load(Ordering::Acquire) {
            return;
        }

        if let Some(task) = state.tasks.pop_front() {
            drop(state);
            execute_guarded(&task);
            state = shared.state.lock().expect(ERR_POISONED_LOCK);
            continue;
        }

        state = shared.condvar.wait(state).expect(ERR_POISONED_LOCK);
    }
}
