//! Worker pool: each worker takes tasks from the queue, runs the handler, pushes results to the sink.

use log::debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use super::cancel::CancelToken;
use super::queue::{QueueReceiver, QueueSender, Take};
use crate::{PipelineError, Task, TaskFailure, TaskResult};

/// Payload function shared by all workers.
pub type Handler<P, O> = Arc<dyn Fn(P) -> anyhow::Result<O> + Send + Sync>;

/// Run one task through `handler`, turning an error or a panic into a [`TaskFailure`].
pub fn execute<P, O>(handler: &Handler<P, O>, task: Task<P>, worker: usize) -> TaskResult<O> {
    let Task { id, payload } = task;
    let start = Instant::now();
    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| handler(payload))) {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(TaskFailure::new(format!("{:#}", e))),
        Err(panic) => Err(TaskFailure::from_panic(panic_message(panic.as_ref()))),
    };
    TaskResult {
        task_id: id,
        outcome,
        worker,
        elapsed: start.elapsed(),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

/// Single worker: take until closed or cancelled. Returns how many results it delivered.
fn worker_loop<P, O>(
    worker: usize,
    task_rx: QueueReceiver<Task<P>>,
    result_tx: QueueSender<TaskResult<O>>,
    handler: Handler<P, O>,
    cancel: CancelToken,
) -> usize {
    let mut delivered = 0_usize;
    loop {
        let task = match task_rx.take(&cancel) {
            Take::Item(task) => task,
            Take::Closed => {
                debug!("worker {}: queue closed and drained", worker);
                break;
            }
            Take::Cancelled => {
                debug!("worker {}: cancelled", worker);
                break;
            }
        };
        // A started task always runs to completion; cancellation is checked again on put and take.
        let result = execute(&handler, task, worker);
        if let Err(e) = result_tx.put(result, &cancel) {
            debug!("worker {}: result dropped ({})", worker, e);
            break;
        }
        delivered += 1;
    }
    drop(result_tx);
    delivered
}

/// Spawn `num_workers` workers sharing `task_rx`. Each gets a clone of `result_tx`; the caller must
/// drop its own sender afterwards so the sink closes once the last worker exits.
pub fn spawn_workers<P, O>(
    task_rx: &QueueReceiver<Task<P>>,
    result_tx: &QueueSender<TaskResult<O>>,
    handler: &Handler<P, O>,
    cancel: &CancelToken,
    num_workers: usize,
) -> Result<Vec<JoinHandle<usize>>, PipelineError>
where
    P: Send + 'static,
    O: Send + 'static,
{
    (0..num_workers)
        .map(|worker| {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let handler = Arc::clone(handler);
            let cancel = cancel.clone();
            thread::Builder::new()
                .name(format!("workpipe-worker-{worker}"))
                .spawn(move || worker_loop(worker, task_rx, result_tx, handler, cancel))
                .map_err(|source| PipelineError::Spawn {
                    role: "worker",
                    source,
                })
        })
        .collect()
}
