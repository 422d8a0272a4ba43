//! The time-based scheduler: a single dedicated thread draining a deadline-ordered min-heap.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use crate::constants::ERR_POISONED_LOCK;
use crate::exec::{abandon_guarded, execute_guarded};
use crate::task::TaskHandle;

/// Default prefix used for the scheduler's thread name.
const DEFAULT_THREAD_NAME: &str = "taskforge-scheduler";

struct HeapItem {
    deadline: Instant,
    seq: u64,
    task: TaskHandle,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}
impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    /// `BinaryHeap` is a max-heap, but the scheduler needs the *earliest* deadline on top, so this
    /// reverses the natural order of `(deadline, seq)`. Ties break by sequence number, earliest
    /// submission first - reversed the same way, so the earliest-submitted item still pops first.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct SchedulerState {
    heap: BinaryHeap<HeapItem>,
    stopped: bool,
    next_seq: u64,
}

struct SchedulerShared {
    state: Mutex<SchedulerState>,
    condvar: Condvar,
}

/// A single dedicated thread that executes tasks at their deadline.
///
/// Submissions are cheap and non-blocking; the scheduler thread wakes at the earliest outstanding
/// deadline, runs everything that has come due, then sleeps again until the new earliest deadline
/// or until woken by a fresh submission.
pub struct Scheduler {
    shared: Arc<SchedulerShared>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Starts the scheduler's dedicated thread immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::with_thread_name(DEFAULT_THREAD_NAME)
    }

    /// Like [`Scheduler::new`], but names the dedicated thread `name` instead of the crate default.
    #[must_use]
    pub fn with_thread_name(name: &str) -> Self {
        let shared = Arc::new(SchedulerShared {
            state: Mutex::new(SchedulerState {
                heap: BinaryHeap::new(),
                stopped: false,
                next_seq: 0,
            }),
            condvar: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let name = name.to_string();
        let thread_name = name.clone();

        let handle = std::thread::Builder::new()
            .name(name)
            .spawn(move || {
                tracing::debug!(scheduler = %thread_name, "scheduler thread starting");
                run_loop(&thread_shared);
                tracing::debug!(scheduler = %thread_name, "scheduler thread stopping");
            })
            .expect("failed to spawn the scheduler's dedicated thread");

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Submits `task` to run at `deadline`. Ties between equal deadlines are broken in submission
    /// order (first submitted, first fired).
    pub fn submit(&self, task: TaskHandle, deadline: Instant) {
        let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);

        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(HeapItem { deadline, seq, task });

        drop(state);
        self.shared.condvar.notify_all();
    }

    /// Cancels every task not yet executed, calling `abandon()` on each outside the lock.
    pub fn clear(&self) {
        let drained: Vec<TaskHandle> = {
            let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);
            std::mem::take(&mut state.heap)
                .into_iter()
                .map(|item| item.task)
                .collect()
        };

        self.shared.condvar.notify_all();

        for task in drained {
            abandon_guarded(&task);
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn run_loop(shared: &Arc<SchedulerShared>) {
    loop {
        let mut state = shared.state.lock().expect(ERR_POISONED_LOCK);

        loop {
            let now = Instant::now();

            let due = match state.heap.peek() {
                Some(item) => item.deadline <= now,
                None => false,
            };

            if !due {
                break;
            }

            let item = state.heap.pop().expect("heap was just observed non-empty");
            drop(state);
            execute_guarded(&item.task);
            state = shared.state.lock().expect(ERR_POISONED_LOCK);
        }

        if state.stopped {
            return;
        }

        match state.heap.peek() {
            None => {
                tracing::trace!("scheduler heap empty, waiting for a submission");
                let _unused = shared.condvar.wait(state).expect(ERR_POISONED_LOCK);
            }
            Some(item) => {
                let timeout = item.deadline.saturating_duration_since(Instant::now());
                tracing::trace!(?timeout, "nothing due yet, sleeping until the next deadline");
                let _unused = shared
                    .condvar
                    .wait_timeout(state, timeout)
                    .expect(ERR_POISONED_LOCK);
            }
        }
    }
}

impl Drop for Scheduler {
    /// Stops the scheduler thread, abandons every task still in the heap, then joins the thread.
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);
            state.stopped = true;
        }
        self.shared.condvar.notify_all();

        self.clear();

        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .expect("scheduler thread panicked past its panic boundary");
        }
    }
}
