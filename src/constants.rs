/// Message used whenever an engine mutex is found poisoned.
///
/// A poisoned lock means some other thread panicked while holding it, which in this crate only
/// happens if a user `execute()`/`abandon()` callback ran *inside* the critical section - which it
/// never should, since every call site releases the lock before invoking a callback. Treat this as
/// an invariant violation rather than something to recover from.
pub(crate) const ERR_POISONED_LOCK: &str =
    "engine mutex poisoned - a callback must have run while the lock was held, which is a bug";
