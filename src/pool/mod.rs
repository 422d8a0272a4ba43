//! The fixed-but-resizable worker pool.

mod bridge;
mod shared;
mod worker;

use std::collections::VecDeque;

use crate::constants::ERR_POISONED_LOCK;
use crate::error::{Error, Result};
use crate::exec::abandon_guarded;
use crate::future::{self, SharedFuture};
use crate::task::TaskHandle;

use bridge::Bridge;
use shared::{PoolShared, PoolState};
use worker::Worker;

use std::sync::Arc;

/// Default prefix used for worker thread names when a pool is built via [`Pool::new`].
const DEFAULT_THREAD_NAME_PREFIX: &str = "taskforge-pool-worker";

/// A fixed-but-resizable pool of worker threads pulling from a single ready FIFO, with support for
/// timer-gated ("delayed") submissions. See the module and crate docs for the full contract.
pub struct Pool {
    shared: Arc<PoolShared>,
}

impl Pool {
    /// Creates a pool with `initial_workers` threads already running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SpawnFailed`] if the operating system refuses to hand out one of the
    /// requested threads. Any threads that were successfully started before the failure are shut
    /// down cleanly as part of returning the error (nothing is leaked).
    pub fn new(initial_workers: usize) -> Result<Self> {
        Self::with_thread_name_prefix(initial_workers, DEFAULT_THREAD_NAME_PREFIX)
    }

    /// Like [`Pool::new`], but names worker threads `{prefix}-{n}` instead of the crate default.
    /// Useful in larger processes running more than one pool, so a thread dump or panic message
    /// identifies which pool a given thread belongs to.
    ///
    /// # Errors
    ///
    /// See [`Pool::new`].
    pub fn with_thread_name_prefix(initial_workers: usize, prefix: &str) -> Result<Self> {
        let shared = PoolShared::new(prefix.to_string());
        let pool = Self { shared };

        match pool.set_nworkers(initial_workers) {
            Ok(ready) => {
                ready.wait();
                Ok(pool)
            }
            // `pool` is dropped here, which runs `Drop for Pool` and cleanly stops whatever subset
            // of workers did manage to start, which is kept running rather than torn down.
            Err(err) => Err(err),
        }
    }

    /// The number of workers currently eligible to pull from the ready queue. Excludes workers
    /// that have been asked to stop but have not yet been joined.
    #[must_use]
    pub fn get_nworkers(&self) -> usize {
        self.shared.state.lock().expect(ERR_POISONED_LOCK).active.len()
    }

    /// Resizes the pool to `want` workers.
    ///
    /// Growing spawns `want - get_nworkers()` new threads and returns an already-ready future.
    /// Shrinking marks the surplus workers to stop and returns a future that resolves once every
    /// one of them has actually stopped and been joined. Calling this with the current worker
    /// count is a no-op that returns an already-ready future.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SpawnFailed`] if growth could not fully complete because the operating
    /// system refused to hand out a thread. Workers started before the failure remain running.
    pub fn set_nworkers(&self, want: usize) -> Result<SharedFuture<()>> {
        let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);

        let old = state.active.len();

        if want > old {
            tracing::debug!(prefix = %self.shared.thread_name_prefix, old, want, "growing pool");

            compact_stopping(&mut state);

            while state.active.len() < want {
                match Worker::spawn(&self.shared) {
                    Ok(worker) => state.active.push(worker),
                    Err(source) => return Err(Error::SpawnFailed(source)),
                }
            }

            Ok(future::make_ready_future())
        } else if want < old {
            tracing::debug!(prefix = %self.shared.thread_name_prefix, old, want, "shrinking pool");

            let to_move = old - want;
            let mut moved = state.active.split_off(old - to_move);

            for worker in &moved {
                worker.request_stop();
            }

            let completions: Vec<_> = moved.iter().map(Worker::completion).collect();
            state.stopping.append(&mut moved);

            drop(state);
            self.shared.condvar.notify_all();

            Ok(future::when_all(completions))
        } else {
            Ok(future::make_ready_future())
        }
    }

    /// Appends `task` to the ready FIFO and wakes one waiting worker.
    pub fn submit(&self, task: TaskHandle) {
        let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);
        state.tasks.push_back(task);
        drop(state);
        self.shared.condvar.notify_one();
    }

    /// Submits `task` gated by `timer`: the task enters the ready FIFO only once `timer` resolves,
    /// via a [`bridge`](Bridge) that arbitrates the race between the timer firing and a concurrent
    /// `clear()`/shutdown. If `timer` is already resolved, the task is promoted
    /// synchronously, before this call returns.
    pub fn submit_delayed(&self, task: TaskHandle, timer: &SharedFuture<()>) {
        let bridge = Bridge::new(&self.shared, task);

        {
            let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);
            state.delayed.push(Arc::clone(&bridge));
        }

        bridge.attach(timer);
    }

    /// Cancels all outstanding work - both ready and delayed - without stopping any worker.
    /// Already-running tasks run to completion; this only affects work that has not started yet.
    ///
    /// After this returns, every delayed bridge that existed at entry has been resolved (either
    /// promoted into the FIFO and then abandoned there, or abandoned directly), `delayed_count` is
    /// zero, and `tasks` is empty.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);

        let claimed_directly: Vec<TaskHandle> = {
            let delayed = std::mem::take(&mut state.delayed);
            let mut still_pending = Vec::with_capacity(delayed.len());
            let mut claimed = Vec::new();

            for bridge in delayed {
                match bridge.try_claim_for_abandon() {
                    Some(task) => claimed.push(task),
                    None => {
                        // The timer won the race and is mid-flight: keep the bridge linked so it
                        // can still find and unlink itself from `delayed` when it completes, and
                        // count it so we know to wait for it below.
                        state.delayed_count += 1;
                        still_pending.push(bridge);
                    }
                }
            }

            state.delayed = still_pending;
            claimed
        };

        while state.delayed_count > 0 {
            state = self.shared.condvar.wait(state).expect(ERR_POISONED_LOCK);
        }

        let drained_tasks: VecDeque<TaskHandle> = std::mem::take(&mut state.tasks);

        drop(state);

        for task in claimed_directly {
            abandon_guarded(&task);
        }

        for task in drained_tasks {
            abandon_guarded(&task);
        }
    }
}

/// Joins any worker in `stopping` whose thread function has already returned, removing it from
/// the list. Called while holding the pool lock, before growing, so that a grow-after-shrink
/// reuses already-free capacity instead of piling up ever more stopped-but-unjoined threads.
fn compact_stopping(state: &mut PoolState) {
    let mut i = 0;
    while i < state.stopping.len() {
        if state.stopping[i].completion().is_ready() {
            let mut worker = state.stopping.remove(i);
            worker.join();
        } else {
            i += 1;
        }
    }
}

impl Drop for Pool {
    /// Stops every worker, cancels outstanding work, then waits for every worker thread to
    /// terminate and joins it.
    ///
    /// The order matters: stop requests and the wakeup broadcast happen *before* `clear()`, so
    /// that a timer firing concurrently with shutdown cannot resurrect a task into the FIFO after
    /// workers have already been told to leave - `clear()` (and the bridge's own claim race) is
    /// what guarantees that resurrected task still gets drained and abandoned rather than run.
    fn drop(&mut self) {
        tracing::debug!(prefix = %self.shared.thread_name_prefix, "pool shutting down");

        let (active, stopping) = {
            let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);
            (
                std::mem::take(&mut state.active),
                std::mem::take(&mut state.stopping),
            )
        };

        for worker in active.iter().chain(stopping.iter()) {
            worker.request_stop();
        }
        self.shared.condvar.notify_all();

        self.clear();

        for mut worker in active.into_iter().chain(stopping.into_iter()) {
            worker.join();
        }

        tracing::debug!(prefix = %self.shared.thread_name_prefix, "pool shut down");
    }
}
