use thiserror::Error;

/// A specialized `Result` type for taskforge operations that return a taskforge
/// [`Error`][enum@Error] on failure.
pub type Result<T> = std::result::Result<T, Error>;

/// An error originating in the worker pool or scheduler.
///
/// This is an umbrella type for the structural failures these engines can report. Callback
/// failures (a panicking `execute()`) are not represented here - they are caught at the task
/// boundary and logged, never propagated as an `Error` (see the crate-level docs).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The pool was asked to grow but the operating system refused to hand out another thread.
    ///
    /// Any workers that were already started as part of the same `set_nworkers` call remain
    /// running - this error only reports that the target count was not fully reached.
    #[error("failed to spawn worker thread")]
    SpawnFailed(#[from] std::io::Error),
}
