//! The delayed-task bridge: a one-shot continuation coupling a timer future to the pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::constants::ERR_POISONED_LOCK;
use crate::future::SharedFuture;
use crate::task::TaskHandle;

use super::shared::PoolShared;

/// Couples a timer future to the pool it was submitted through.
///
/// The bridge holds a *weak* reference back to the pool: the pool's `delayed` set holds the only
/// strong reference to the bridge, so a strong reference in the other direction would form a
/// cycle that neither side could ever free.
///
/// The `claimed` latch is the heart of the timer-vs-shutdown race described in the data model:
/// whichever side - the timer's continuation firing, or the pool's `clear()`/destructor abandoning
/// outstanding work - wins the compare-exchange gets to move the task; the loser does nothing but
/// drop its `Arc<Bridge>`.
pub(crate) struct Bridge {
    pool: Weak<PoolShared>,
    claimed: AtomicBool,
    task: Mutex<Option<TaskHandle>>,
    /// Debug-only tally of successful claims, to assert the latch is won at most once.
    #[cfg(debug_assertions)]
    claim_count: std::sync::atomic::AtomicUsize,
}

impl Bridge {
    pub(crate) fn new(pool: &Arc<PoolShared>, task: TaskHandle) -> Arc<Self> {
        Arc::new(Self {
            pool: Arc::downgrade(pool),
            claimed: AtomicBool::new(false),
            task: Mutex::new(Some(task)),
            #[cfg(debug_assertions)]
            claim_count: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    /// Attempts to win the claim race. Returns `true` exactly once per bridge, to exactly one
    /// caller, regardless of how many threads race to call this concurrently.
    fn try_claim(&self) -> bool {
        let won = self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        #[cfg(debug_assertions)]
        if won {
            let previous = self.claim_count.fetch_add(1, Ordering::Relaxed);
            debug_assert_eq!(previous, 0, "bridge claimed more than once");
        }

        won
    }

    /// Takes the task out, for a caller that has already won [`try_claim`][Self::try_claim].
    fn take_task(&self) -> Option<TaskHandle> {
        self.task.lock().expect(ERR_POISONED_LOCK).take()
    }

    /// Installs this bridge as the one-shot continuation of `timer`. If `timer` is already ready,
    /// the continuation (and therefore the promotion into the ready FIFO) happens synchronously,
    /// inline in this call, matching the boundary behaviour of an already-ready timer.
    pub(crate) fn attach(self: &Arc<Self>, timer: &SharedFuture<()>) {
        let bridge = Arc::clone(self);
        timer.on_complete(move || bridge.on_timer_fired());
    }

    /// The timer's continuation. Fires on whatever thread completed the timer future - possibly a
    /// worker thread of the very pool this bridge is promoting into, which is why this function
    /// takes the pool lock exactly once and never recursively.
    fn on_timer_fired(self: Arc<Self>) {
        if !self.try_claim() {
            // Lost the race to a concurrent clear()/shutdown. Nothing left to do: the abandoning
            // side already took (or will take) the task and will call abandon() on it.
            return;
        }

        let Some(pool) = self.pool.upgrade() else {
            // The pool is already fully torn down. This should not happen in practice because the
            // pool always drains `delayed` before it lets its last Arc<PoolShared> drop, but if it
            // ever did, abandoning rather than silently dropping keeps the task's contract intact.
            if let Some(task) = self.take_task() {
                crate::exec::abandon_guarded(&task);
            }
            return;
        };

        let task = self.take_task();

        let mut state = pool.state.lock().expect(ERR_POISONED_LOCK);
        state.delayed.retain(|bridge| !Arc::ptr_eq(bridge, &self));

        if let Some(task) = task {
            state.tasks.push_back(task);
        }

        if state.delayed_count > 0 {
            state.delayed_count -= 1;
        }

        // Notify under the lock: this single condvar also wakes workers waiting for new ready
        // work, and a concurrent clear()/destructor may be waiting for delayed_count to reach
        // zero. Both cases are safe to fold into one unconditional notify_all, since spurious
        // wakeups are tolerated everywhere this condvar is waited on.
        pool.condvar.notify_all();
    }

    /// Called by `clear()`/the destructor while holding the pool lock. On success, the bridge is
    /// already unlinked by the caller (it is draining the whole `delayed` set) and the returned
    /// task must be abandoned by the caller, outside the lock. On failure, the timer has already
    /// won the race and is mid-flight; the caller must keep this bridge around and wait for it to
    /// finish promoting (or abandoning) the task on its own.
    pub(crate) fn try_claim_for_abandon(self: &Arc<Self>) -> Option<TaskHandle> {
        if self.try_claim() {
            self.take_task()
        } else {
            None
        }
    }
}
