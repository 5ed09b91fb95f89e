//! Dispatcher: sole producer of tasks. Fills the task queue in order, then closes it.

use log::debug;
use std::thread::{self, JoinHandle};

use super::cancel::CancelToken;
use super::queue::QueueSender;
use crate::{PipelineError, Task};

/// Owns the task queue's producer side. Dropping it closes the queue.
pub struct Dispatcher<P> {
    queue: QueueSender<Task<P>>,
    cancel: CancelToken,
    submitted: usize,
}

impl<P> Dispatcher<P> {
    pub fn new(queue: QueueSender<Task<P>>, cancel: CancelToken) -> Self {
        Self {
            queue,
            cancel,
            submitted: 0,
        }
    }

    /// Enqueue each task in order (blocking while the queue is full), then close the queue.
    /// Returns the number enqueued by this call. The queue is closed on every return path.
    pub fn submit<I>(&mut self, tasks: I) -> Result<usize, PipelineError>
    where
        I: IntoIterator<Item = Task<P>>,
    {
        if self.queue.is_closed() {
            return Err(PipelineError::ClosedQueue);
        }
        let mut count = 0_usize;
        for task in tasks {
            if let Err(e) = self.submit_one(task) {
                self.close();
                return Err(e);
            }
            count += 1;
        }
        self.close();
        Ok(count)
    }

    /// Enqueue a single task without closing. Fails with `ClosedQueue` once closed.
    pub fn submit_one(&mut self, task: Task<P>) -> Result<(), PipelineError> {
        self.queue.put(task, &self.cancel)?;
        self.submitted += 1;
        Ok(())
    }

    /// Signal "no more work". Idempotent.
    pub fn close(&mut self) {
        if !self.queue.is_closed() {
            debug!("dispatcher: closing task queue after {} tasks", self.submitted);
        }
        self.queue.close();
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Total tasks enqueued over this dispatcher's lifetime.
    pub fn submitted(&self) -> usize {
        self.submitted
    }
}

impl<P> Drop for Dispatcher<P> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Run a dispatcher on its own thread. The handle yields how many tasks were enqueued;
/// cancellation or a vanished worker pool ends submission early without an error.
pub fn spawn_dispatch_thread<P>(
    mut dispatcher: Dispatcher<P>,
    tasks: Vec<Task<P>>,
) -> Result<JoinHandle<usize>, PipelineError>
where
    P: Send + 'static,
{
    thread::Builder::new()
        .name("workpipe-dispatcher".to_string())
        .spawn(move || {
            let total = tasks.len();
            match dispatcher.submit(tasks) {
                Ok(n) => debug!("dispatcher: submitted {} tasks", n),
                Err(e) => debug!(
                    "dispatcher: stopped after {} of {} tasks ({})",
                    dispatcher.submitted(),
                    total,
                    e
                ),
            }
            dispatcher.submitted()
        })
        .map_err(|source| PipelineError::Spawn {
            role: "dispatcher",
            source,
        })
}
