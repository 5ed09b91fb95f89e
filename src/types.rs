//! Public and internal types for the workpipe API and pipeline.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::PipelineError;
use crate::engine::ops::Op;
use crate::utils::config::{QueueConsts, WorkerLimits};

/// Identifier for a task. Assigned by the caller; the pipeline only carries it through.
pub type TaskId = u64;

/// Unit of work: identifier plus payload. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task<P> {
    pub id: TaskId,
    pub payload: P,
}

impl<P> Task<P> {
    pub fn new(id: TaskId, payload: P) -> Self {
        Self { id, payload }
    }
}

/// Failure raised by a task's payload function (error return or panic).
/// Carried in [`TaskResult::outcome`]; never escalated to a pipeline error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskFailure {
    pub message: String,
    /// True when the payload panicked rather than returning an error.
    pub panicked: bool,
}

impl TaskFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            panicked: false,
        }
    }

    pub fn from_panic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            panicked: true,
        }
    }
}

/// Output of exactly one task, produced by one worker.
#[derive(Clone, Debug)]
pub struct TaskResult<O> {
    /// Id of the task this result came from.
    pub task_id: TaskId,
    /// Output value or the payload's failure.
    pub outcome: Result<O, TaskFailure>,
    /// Index of the worker that ran the task.
    pub worker: usize,
    /// Time spent inside the payload function.
    pub elapsed: Duration,
}

impl<O> TaskResult<O> {
    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }

    pub fn output(&self) -> Option<&O> {
        self.outcome.as_ref().ok()
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        self.outcome.as_ref().err()
    }
}

/// How a collection ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectStatus {
    /// All expected results arrived.
    Complete,
    /// The cancellation signal fired first.
    Cancelled,
    /// Workers finished with fewer results than expected (caller bug signal).
    Exhausted,
}

/// Why the cancellation signal fired. Only the first reason is kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelReason {
    Requested,
    Deadline,
    Interrupted,
}

/// Everything [`Pipeline::run`](crate::pipeline::Pipeline::run) hands back.
#[derive(Debug)]
pub struct PipelineOutcome<O> {
    /// Results in completion order.
    pub results: Vec<TaskResult<O>>,
    pub status: CollectStatus,
    /// Number of results the collector was waiting for.
    pub expected: usize,
    /// Number of tasks the dispatcher actually enqueued.
    pub submitted: usize,
    /// Results the workers pushed into the sink. Equals `results.len()` unless a pushed result was
    /// still buffered in the sink when collection stopped.
    pub delivered: usize,
    /// Set only when `status` is `Cancelled`.
    pub cancel_reason: Option<CancelReason>,
}

impl<O> PipelineOutcome<O> {
    pub fn is_complete(&self) -> bool {
        self.status == CollectStatus::Complete
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskResult<O>> {
        self.results.iter().filter(|r| r.is_failure())
    }

    pub fn successes(&self) -> impl Iterator<Item = &TaskResult<O>> {
        self.results.iter().filter(|r| !r.is_failure())
    }

    /// Turn a non-complete status into the matching [`PipelineError`]. Failed tasks do not count as errors.
    pub fn ensure_complete(self) -> Result<Self, PipelineError> {
        match self.status {
            CollectStatus::Complete => Ok(self),
            CollectStatus::Cancelled => Err(PipelineError::Cancelled),
            CollectStatus::Exhausted => Err(PipelineError::Exhausted {
                expected: self.expected,
                received: self.results.len(),
            }),
        }
    }
}

/// Lib options for a pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineOpts {
    /// Number of worker threads. Must be at least 1.
    pub workers: usize,
    /// Results to wait for. When None, the number of submitted tasks.
    pub expected: Option<usize>,
    /// Cancel automatically once this much time has passed, unless collection finishes first.
    pub deadline: Option<Duration>,
    /// Task queue capacity; the dispatcher blocks when full.
    pub queue_capacity: usize,
    /// Result sink capacity; workers block when full.
    pub sink_capacity: usize,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            workers: WorkerLimits::current().default_workers(),
            expected: None,
            deadline: None,
            queue_capacity: QueueConsts::DEFAULT_QUEUE_CAP,
            sink_capacity: QueueConsts::DEFAULT_SINK_CAP,
        }
    }
}

/// Full options (CLI). Use [`PipelineOpts`] for lib.
#[derive(Clone, Debug)]
pub struct Opts {
    pub pipeline: PipelineOpts,
    /// Payload function applied to every task.
    pub op: Op,
    /// Divisor for [`Op::Divide`]. When None, tasks divide 100 by their payload.
    pub divisor: Option<i64>,
    /// Per-task delay in milliseconds before the op runs.
    pub sleep_ms: u64,
    /// Cancel after this many results have been collected.
    pub cancel_after: Option<usize>,
    /// Print the outcome as JSON instead of text.
    pub json: bool,
    /// Debug logging and progress bar.
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            pipeline: PipelineOpts::default(),
            op: Op::Double,
            divisor: None,
            sleep_ms: 0,
            cancel_after: None,
            json: false,
            verbose: false,
        }
    }
}
