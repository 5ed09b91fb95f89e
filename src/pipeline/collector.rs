//! Collector: sole consumer of the result sink.

use log::{debug, warn};

use super::cancel::{CancelToken, DeadlineGuard};
use super::queue::{QueueReceiver, Take};
use crate::{CollectStatus, TaskResult};

/// Results gathered by [`Collector::collect`] plus how collection ended.
pub type Collected<O> = (Vec<TaskResult<O>>, CollectStatus);

pub struct Collector<O> {
    sink: QueueReceiver<TaskResult<O>>,
    cancel: CancelToken,
    deadline: Option<DeadlineGuard>,
}

impl<O> Collector<O> {
    pub fn new(sink: QueueReceiver<TaskResult<O>>, cancel: CancelToken) -> Self {
        Self {
            sink,
            cancel,
            deadline: None,
        }
    }

    /// Hand the run's deadline to the collector. It is disarmed the moment collection completes,
    /// and dropped (timer joined) with the collector.
    pub fn with_deadline_guard(mut self, guard: DeadlineGuard) -> Self {
        self.deadline = Some(guard);
        self
    }

    /// Disarm the deadline and check the signal. False if either already cancelled the run.
    fn finish(&self) -> bool {
        let disarmed = self.deadline.as_ref().is_none_or(DeadlineGuard::try_disarm);
        disarmed && !self.cancel.is_cancelled()
    }

    /// Drain the sink until `expected` results arrive, the signal fires, or every worker is gone.
    pub fn collect(&self, expected: usize) -> Collected<O> {
        self.collect_with(expected, |_| {})
    }

    /// Same as [`collect`](Self::collect), calling `on_result` for each result as it arrives.
    /// The callback may cancel; collection stops before the next take. A signal that fired before
    /// the last expected result was accepted ends the run `Cancelled`, never `Complete`.
    pub fn collect_with<F>(&self, expected: usize, mut on_result: F) -> Collected<O>
    where
        F: FnMut(&TaskResult<O>),
    {
        let mut results = Vec::new();
        let status = loop {
            if results.len() >= expected {
                let finished = self.finish();
                if finished || expected == 0 {
                    break CollectStatus::Complete;
                }
                break CollectStatus::Cancelled;
            }
            match self.sink.take(&self.cancel) {
                Take::Item(result) => {
                    on_result(&result);
                    results.push(result);
                }
                Take::Closed => {
                    warn!(
                        "workers finished after {} of {} expected results",
                        results.len(),
                        expected
                    );
                    break CollectStatus::Exhausted;
                }
                Take::Cancelled => break CollectStatus::Cancelled,
            }
        };
        debug!(
            "collector: {:?} with {} of {} results",
            status,
            results.len(),
            expected
        );
        (results, status)
    }
}
