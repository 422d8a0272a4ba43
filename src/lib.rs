//! A task-execution substrate: a resizable worker pool and a time-based scheduler, sharing a
//! common task protocol and a small crate-owned future/promise layer.
//!
//! - [`Pool`] runs submitted [`Task`]s on a user-chosen number of worker threads, with live resize
//!   and timer-gated ("delayed") submission via [`Pool::submit_delayed`].
//! - [`Scheduler`] runs submitted tasks at an absolute deadline, on its own dedicated thread.
//!
//! Both engines report completion through [`SharedFuture`], this crate's own minimal synchronous
//! future/promise pair - there is no async runtime dependency here, by design: these are
//! OS-thread-based engines, not an async executor.

mod constants;
mod error;
mod exec;
mod future;
mod pool;
mod scheduler;
mod task;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use future::{make_ready_future, when_all, Promise, SharedFuture};
pub use pool::Pool;
pub use scheduler::Scheduler;
pub use task::{Task, TaskHandle};
