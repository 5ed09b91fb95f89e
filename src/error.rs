//! Pipeline-level error taxonomy. Task payload failures are not here; they live in [`TaskFailure`](crate::TaskFailure).

use thiserror::Error;

/// Errors surfaced by queues, the dispatcher and the orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Submission after the task queue was closed. Programmer error; never retried.
    #[error("task queue is closed; no further tasks may be submitted in this run")]
    ClosedQueue,

    /// A blocking queue operation or the collection was interrupted by cancellation.
    #[error("pipeline cancelled")]
    Cancelled,

    /// Every receiver (or sender) on the other side of a queue is gone.
    #[error("queue peer disconnected")]
    Disconnected,

    /// Workers finished before the expected number of results arrived.
    #[error("workers exhausted after {received} of {expected} expected results")]
    Exhausted { expected: usize, received: usize },

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        role: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
