use log::debug;
use std::sync::Arc;
use std::thread::JoinHandle;

use super::cancel::CancelToken;
use super::collector::Collector;
use super::context::{PipelineHandles, create_pipeline_channels};
use super::dispatcher::{Dispatcher, spawn_dispatch_thread};
use super::worker::{Handler, spawn_workers};
use crate::{CollectStatus, PipelineError, PipelineOpts, PipelineOutcome, Task, TaskResult};

/// A bounded worker pool with cancellable dispatch.
///
/// The cancellation signal belongs to the pipeline and is single-fire: once cancelled, later
/// runs on the same `Pipeline` end immediately with [`CollectStatus::Cancelled`](crate::CollectStatus::Cancelled).
/// Queues are created fresh for every run.
#[derive(Debug)]
pub struct Pipeline {
    opts: PipelineOpts,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(opts: PipelineOpts) -> Self {
        Self {
            opts,
            cancel: CancelToken::new(),
        }
    }

    pub fn opts(&self) -> &PipelineOpts {
        &self.opts
    }

    pub fn cancel(&self) -> bool {
        self.cancel.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Clone of the signal, e.g. for a Ctrl+C handler or another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run `tasks` through `handler` on the configured worker pool.
    pub fn run<P, O, F>(&self, tasks: Vec<Task<P>>, handler: F) -> Result<PipelineOutcome<O>, PipelineError>
    where
        P: Send + 'static,
        O: Send + 'static,
        F: Fn(P) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        self.run_with(tasks, handler, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_result` on the caller's thread for each collected result.
    pub fn run_with<P, O, F, C>(
        &self,
        tasks: Vec<Task<P>>,
        handler: F,
        on_result: C,
    ) -> Result<PipelineOutcome<O>, PipelineError>
    where
        P: Send + 'static,
        O: Send + 'static,
        F: Fn(P) -> anyhow::Result<O> + Send + Sync + 'static,
        C: FnMut(&TaskResult<O>),
    {
        let expected = self.opts.expected.unwrap_or(tasks.len());
        let handler: Handler<P, O> = Arc::new(handler);
        let PipelineHandles {
            collector,
            dispatch_handle,
            worker_handles,
        } = start_pipeline(tasks, handler, &self.opts, &self.cancel)?;

        let (results, status) = collector.collect_with(expected, on_result);
        // Dropping the sink receiver unblocks any worker still waiting to push,
        // and joins the deadline timer.
        drop(collector);

        let Shutdown {
            submitted,
            delivered,
        } = shutdown_pipeline_handles(dispatch_handle, worker_handles)?;
        // A cancel after the run completed does not describe this run.
        let cancel_reason = match status {
            CollectStatus::Cancelled => self.cancel.reason(),
            CollectStatus::Complete | CollectStatus::Exhausted => None,
        };
        Ok(PipelineOutcome {
            results,
            status,
            expected,
            submitted,
            delivered,
            cancel_reason,
        })
    }
}

/// Start dispatcher and workers for one run. Caller collects from the returned collector and must
/// then call [`shutdown_pipeline_handles`].
pub fn start_pipeline<P, O>(
    tasks: Vec<Task<P>>,
    handler: Handler<P, O>,
    opts: &PipelineOpts,
    cancel: &CancelToken,
) -> Result<PipelineHandles<O>, PipelineError>
where
    P: Send + 'static,
    O: Send + 'static,
{
    if opts.workers == 0 {
        return Err(PipelineError::NoWorkers);
    }
    debug!(
        "pipeline: {} tasks, {} workers, queue cap {}, sink cap {}",
        tasks.len(),
        opts.workers,
        opts.queue_capacity,
        opts.sink_capacity
    );

    let channels = create_pipeline_channels::<P, O>(opts);
    let deadline = opts
        .deadline
        .map(|d| cancel.with_deadline(d))
        .transpose()?;

    let worker_handles = spawn_workers(
        &channels.task_rx,
        &channels.result_tx,
        &handler,
        cancel,
        opts.workers,
    )?;
    // Workers hold the only remaining sink senders; the sink closes when the last one exits.
    drop(channels.result_tx);
    drop(channels.task_rx);

    let dispatcher = Dispatcher::new(channels.task_tx, cancel.clone());
    let dispatch_handle = spawn_dispatch_thread(dispatcher, tasks)?;

    let mut collector = Collector::new(channels.result_rx, cancel.clone());
    if let Some(guard) = deadline {
        collector = collector.with_deadline_guard(guard);
    }
    Ok(PipelineHandles {
        collector,
        dispatch_handle,
        worker_handles,
    })
}

/// Counts from a joined pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shutdown {
    /// Tasks the dispatcher enqueued.
    pub submitted: usize,
    /// Results the workers pushed into the sink, summed over all workers.
    pub delivered: usize,
}

/// Join the dispatcher and every worker.
/// Drop the collector first, or a worker blocked on a full sink never exits.
pub fn shutdown_pipeline_handles(
    dispatch_handle: JoinHandle<usize>,
    worker_handles: Vec<JoinHandle<usize>>,
) -> Result<Shutdown, PipelineError> {
    let mut panicked = false;
    let mut delivered = 0;
    for (worker, h) in worker_handles.into_iter().enumerate() {
        match h.join() {
            Ok(count) => {
                debug!("worker {}: delivered {} results", worker, count);
                delivered += count;
            }
            Err(_) => panicked = true,
        }
    }
    let submitted = dispatch_handle
        .join()
        .map_err(|_| PipelineError::ThreadPanicked("dispatcher"))?;
    if panicked {
        return Err(PipelineError::ThreadPanicked("worker"));
    }
    Ok(Shutdown {
        submitted,
        delivered,
    })
}
