//! A minimal, synchronous future/promise pair.
//!
//! This crate is the sole consumer of the "asynchronous result with completion continuation"
//! abstraction it needs internally, so rather than take on an async runtime dependency it owns a
//! small implementation of that contract: readiness query, blocking wait, one-shot continuation
//! attachment, an already-ready constructor, an aggregate-of-many constructor, and a `then`
//! adapter. Every completion signal the two engines expose - worker completion, `set_nworkers`'s
//! return value, a delayed-task bridge's timer - is an instance of [`SharedFuture`].
//!
//! The shape is directly descended from a Mutex-guarded one-shot event: the state starts out
//! `Pending` with a list of not-yet-fired continuations, and transitions exactly once to `Ready`.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex};

use crate::constants::ERR_POISONED_LOCK;

type Continuation = Box<dyn FnOnce() + Send + 'static>;

enum State<T> {
    Pending(Vec<Continuation>),
    Ready(T),
}

struct Inner<T> {
    state: Mutex<State<T>>,
    condvar: Condvar,
}

/// A cloneable handle to a value that becomes available at most once.
pub struct SharedFuture<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SharedFuture<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for SharedFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFuture")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// The writable end of a [`SharedFuture`]. Fulfilling it wakes every blocked waiter and runs every
/// continuation registered via [`SharedFuture::on_complete`], in registration order.
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").finish()
    }
}

impl<T: Clone + Send + 'static> SharedFuture<T> {
    /// Creates a not-yet-resolved future paired with the promise that resolves it.
    #[must_use]
    pub fn pair() -> (Promise<T>, Self) {
        let inner = Arc::new(Inner {
            state: Mutex::new(State::Pending(Vec::new())),
            condvar: Condvar::new(),
        });

        (
            Promise {
                inner: Arc::clone(&inner),
            },
            Self { inner },
        )
    }

    /// Creates a future that is already resolved to `value`. Corresponds to the external
    /// contract's `make_ready_future()`.
    #[must_use]
    pub fn ready(value: T) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(State::Ready(value)),
            condvar: Condvar::new(),
        });

        Self { inner }
    }

    /// Returns whether the value is available without blocking.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(
            &*self.inner.state.lock().expect(ERR_POISONED_LOCK),
            State::Ready(_)
        )
    }

    /// Blocks the calling thread until the value is available, then returns a clone of it.
    pub fn wait(&self) -> T {
        let mut state = self.inner.state.lock().expect(ERR_POISONED_LOCK);

        loop {
            match &*state {
                State::Ready(value) => return value.clone(),
                State::Pending(_) => {
                    state = self.inner.condvar.wait(state).expect(ERR_POISONED_LOCK);
                }
            }
        }
    }

    /// Registers a one-shot continuation to run when the value becomes available. If it is
    /// already available, the continuation runs inline, on the calling thread, before this
    /// method returns.
    pub fn on_complete<F>(&self, continuation: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.inner.state.lock().expect(ERR_POISONED_LOCK);

        match &mut *state {
            State::Ready(_) => {
                drop(state);
                continuation();
            }
            State::Pending(continuations) => continuations.push(Box::new(continuation)),
        }
    }

    /// Adapts this future into a new one whose value is computed from this one's, once available.
    /// Corresponds to the external contract's `then()`.
    #[must_use]
    pub fn then<U, F>(&self, continuation: F) -> SharedFuture<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let (promise, future) = SharedFuture::pair();
        let source = self.clone();

        self.on_complete(move || {
            let value = source.wait();
            promise.set(continuation(value));
        });

        future
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Resolves the future, waking every blocked waiter and firing every registered continuation.
    ///
    /// Taking `self` by value means a promise can only be fulfilled once - a stray second call
    /// site simply doesn't compile, since there is no `self` left to call it on.
    pub fn set(self, value: T) {
        let continuations = {
            let mut state = self.inner.state.lock().expect(ERR_POISONED_LOCK);

            let State::Pending(continuations) = std::mem::replace(&mut *state, State::Ready(value))
            else {
                unreachable!("a Promise<T> can only be constructed alongside a Pending state and is consumed by this call, so it cannot observe Ready here")
            };
            continuations
        };

        self.inner.condvar.notify_all();

        for continuation in continuations {
            continuation();
        }
    }
}

/// Produces an already-ready future. Corresponds to the external contract's `make_ready_future()`.
#[must_use]
pub fn make_ready_future() -> SharedFuture<()> {
    SharedFuture::ready(())
}

/// Produces a future that resolves once every input future has resolved. Corresponds to the
/// external contract's `when_all()`.
///
/// An empty input produces an already-ready future.
#[must_use]
pub fn when_all<I>(futures: I) -> SharedFuture<()>
where
    I: IntoIterator<Item = SharedFuture<()>>,
{
    use std::sync::atomic::{AtomicUsize, Ordering};

    let futures: Vec<_> = futures.into_iter().collect();

    if futures.is_empty() {
        return make_ready_future();
    }

    let (promise, result) = SharedFuture::pair();
    let promise = Arc::new(Mutex::new(Some(promise)));
    let remaining = Arc::new(AtomicUsize::new(futures.len()));

    for future in futures {
        let promise = Arc::clone(&promise);
        let remaining = Arc::clone(&remaining);

        future.on_complete(move || {
            if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                if let Some(promise) = promise.lock().expect(ERR_POISONED_LOCK).take() {
                    promise.set(());
                }
            }
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn ready_future_is_ready_and_waits_instantly() {
        let future = SharedFuture::ready(42);

        assert!(future.is_ready());
        assert_eq!(future.wait(), 42);
    }

    #[test]
    fn on_complete_fires_inline_when_already_ready() {
        let future = SharedFuture::ready(());
        let fired = Arc::new(AtomicBool::new(false));

        let fired_clone = Arc::clone(&fired);
        future.on_complete(move || fired_clone.store(true, Ordering::SeqCst));

        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn on_complete_fires_on_set_when_pending() {
        let (promise, future) = SharedFuture::pair();
        let fired = Arc::new(AtomicBool::new(false));

        let fired_clone = Arc::clone(&fired);
        future.on_complete(move || fired_clone.store(true, Ordering::SeqCst));

        assert!(!fired.load(Ordering::SeqCst));
        promise.set(());
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn wait_blocks_until_set_from_another_thread() {
        let (promise, future) = SharedFuture::pair();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            promise.set(7);
        });

        assert_eq!(future.wait(), 7);
        handle.join().unwrap();
    }

    #[test]
    fn when_all_resolves_after_every_input() {
        let (promise_a, future_a) = SharedFuture::pair();
        let (promise_b, future_b) = SharedFuture::pair();

        let combined = when_all([future_a, future_b]);
        assert!(!combined.is_ready());

        promise_a.set(());
        assert!(!combined.is_ready());

        promise_b.set(());
        assert!(combined.is_ready());
    }

    #[test]
    fn when_all_empty_is_ready_immediately() {
        let combined = when_all(std::iter::empty());
        assert!(combined.is_ready());
    }

    #[test]
    fn then_chains_a_value_transformation() {
        let future = SharedFuture::ready(2);
        let chained = future.then(|value| value * 10);

        assert_eq!(chained.wait(), 20);
    }

    #[test]
    fn cloned_future_observes_same_resolution() {
        let (promise, future) = SharedFuture::pair();
        let clone = future.clone();

        promise.set(9);

        assert_eq!(future.wait(), 9);
        assert_eq!(clone.wait(), 9);
    }
}
