use std::sync::Arc;

/// A unit of work accepted by one of the engines in this crate.
///
/// Exactly one of [`execute`][Task::execute] or [`abandon`][Task::abandon] is invoked over the
/// lifetime of a task handle held by an engine: `execute` if the engine got around to running the
/// work, `abandon` if the engine decided (due to `clear()`, shutdown, or a losing race against a
/// delayed-task bridge) that it never will. Implementations that need to distinguish the two
/// outcomes for a caller typically do so by resolving some other completion signal from inside
/// these methods (the engines themselves are indifferent to what a task does).
///
/// Reference counting is handled by `Arc<dyn Task>` rather than a hand-rolled refcount: an engine's
/// last strong reference to a task being dropped *is* the "release" step described by the data
/// model. Single-list membership is likewise structural - a task handle is moved into whichever
/// container currently owns it, so the same handle can never be linked into two queues at once
/// without an explicit (and, in this crate, never-performed) `Arc::clone`.
pub trait Task: Send + Sync {
    /// Runs the work. Called at most once, on an engine-owned thread, never while any engine lock
    /// is held.
    fn execute(&self);

    /// Notifies the work that it will never run. Called at most once, never while any engine lock
    /// is held.
    fn abandon(&self);
}

/// A reference-counted handle to a submittable task.
pub type TaskHandle = Arc<dyn Task>;
