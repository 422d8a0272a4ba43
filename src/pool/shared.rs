use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use crate::task::TaskHandle;

use super::bridge::Bridge;
use super::worker::Worker;

/// State shared between the `Pool` handle and every worker thread it owns, plus every delayed-task
/// bridge submitted through it.
///
/// A single mutex covers every field here, and a single condition variable is signalled on new
/// ready work, stop requests, and shutdown progress (delayed-task promotion
/// notifies this condvar while still holding the lock).
pub(crate) struct PoolShared {
    pub(crate) state: Mutex<PoolState>,
    pub(crate) condvar: Condvar,
    pub(crate) thread_name_prefix: String,
}

pub(crate) struct PoolState {
    /// Workers currently eligible to pull from `tasks`.
    pub(crate) active: Vec<Worker>,
    /// Workers asked to stop but not yet joined. Together with `active` this is the idiomatic
    /// restructuring of "a single vector with a stopping suffix of length `pending`" - see
    /// DESIGN.md.
    pub(crate) stopping: Vec<Worker>,
    pub(crate) tasks: VecDeque<TaskHandle>,
    pub(crate) delayed: Vec<Arc<Bridge>>,
    pub(crate) delayed_count: usize,
}

impl PoolShared {
    pub(crate) fn new(thread_name_prefix: String) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PoolState {
                active: Vec::new(),
                stopping: Vec::new(),
                tasks: VecDeque::new(),
                delayed: Vec::new(),
                delayed_count: 0,
            }),
            condvar: Condvar::new(),
            thread_name_prefix,
        })
    }
}
