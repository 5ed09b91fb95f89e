//! Workpipe: bounded worker pool with cancellable dispatch

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use error::PipelineError;
pub use pipeline::{CancelToken, Pipeline};
pub use types::*;

use log::debug;
use std::time::Duration;

/// Result alias used by the public workpipe API
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Single entry point: run `tasks` through `handler` on `worker_count` workers and collect up to
/// `expected` results, cancelling automatically after `deadline` when one is given.
///
/// Returns the results in completion order plus a [`CollectStatus`]. Failed tasks stay in the
/// results with their [`TaskFailure`]; use [`PipelineOutcome::ensure_complete`] to treat a
/// cancelled or exhausted run as an error.
///
/// To cancel from elsewhere, build a [`Pipeline`] and hand out its [`CancelToken`]:
///
/// ```ignore
/// let pipeline = workpipe::Pipeline::new(PipelineOpts { workers: 4, ..Default::default() });
/// let token = pipeline.cancel_token();
/// ctrlc::set_handler(move || { token.cancel(); })?;
/// let outcome = pipeline.run(tasks, |x: i64| Ok(x * 2))?;
/// ```
pub fn run<P, O, F>(
    tasks: Vec<Task<P>>,
    worker_count: usize,
    expected: usize,
    deadline: Option<Duration>,
    handler: F,
) -> Result<PipelineOutcome<O>>
where
    P: Send + 'static,
    O: Send + 'static,
    F: Fn(P) -> anyhow::Result<O> + Send + Sync + 'static,
{
    let opts = PipelineOpts {
        workers: worker_count,
        expected: Some(expected),
        deadline,
        ..PipelineOpts::default()
    };
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    Pipeline::new(opts).run(tasks, handler)
}
