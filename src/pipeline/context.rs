//! Pipeline wiring: the queue/sink channels and the handles of a running pipeline.

use std::thread::JoinHandle;

use super::collector::Collector;
use super::queue::{QueueReceiver, QueueSender, bounded_queue};
use crate::{PipelineOpts, Task, TaskResult};

/// Channels for one run. Dispatcher gets `task_tx`; workers get clones of `task_rx` and `result_tx`;
/// the collector gets `result_rx`. Created once per run and dropped when it ends.
pub struct PipelineChannels<P, O> {
    pub task_tx: QueueSender<Task<P>>,
    pub task_rx: QueueReceiver<Task<P>>,
    pub result_tx: QueueSender<TaskResult<O>>,
    pub result_rx: QueueReceiver<TaskResult<O>>,
}

pub fn create_pipeline_channels<P, O>(opts: &PipelineOpts) -> PipelineChannels<P, O> {
    let (task_tx, task_rx) = bounded_queue::<Task<P>>(opts.queue_capacity);
    let (result_tx, result_rx) = bounded_queue::<TaskResult<O>>(opts.sink_capacity);
    PipelineChannels {
        task_tx,
        task_rx,
        result_tx,
        result_rx,
    }
}

/// Handles returned by [`start_pipeline`](super::start_pipeline): collect from `collector`, then
/// pass the rest to [`shutdown_pipeline_handles`](super::shutdown_pipeline_handles).
/// The collector owns the run's deadline, if any.
pub struct PipelineHandles<O> {
    pub collector: Collector<O>,
    pub dispatch_handle: JoinHandle<usize>,
    pub worker_handles: Vec<JoinHandle<usize>>,
}
