//! Bounded, closable queue used for both the task queue and the result sink.
//!
//! Built on a crossbeam bounded channel: closing is dropping the sender, and the queue
//! counts as closed for receivers once every sender clone is gone. Every blocking
//! operation also waits on the cancellation signal.

use crossbeam_channel::{Receiver, Sender, bounded, select};

use super::cancel::CancelToken;
use crate::PipelineError;

/// Outcome of a cancellation-aware take.
#[derive(Debug, PartialEq, Eq)]
pub enum Take<T> {
    Item(T),
    /// Closed and drained: no sender remains and nothing is buffered.
    Closed,
    Cancelled,
}

/// Producer half. Cloning gives another producer on the same queue (workers share the result sink this way).
pub struct QueueSender<T> {
    tx: Option<Sender<T>>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Consumer half. Cloning gives another consumer; each item goes to exactly one of them.
pub struct QueueReceiver<T> {
    rx: Receiver<T>,
}

impl<T> Clone for QueueReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

/// Create a queue with fixed `capacity`. A capacity of 0 makes every put a rendezvous.
pub fn bounded_queue<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = bounded(capacity);
    (QueueSender { tx: Some(tx) }, QueueReceiver { rx })
}

impl<T> QueueSender<T> {
    /// Enqueue `item`, blocking while the queue is full. Fails with `ClosedQueue` after [`close`](Self::close),
    /// `Cancelled` if the signal fires before a slot frees up, `Disconnected` if every receiver is gone.
    pub fn put(&self, item: T, cancel: &CancelToken) -> Result<(), PipelineError> {
        let tx = self.tx.as_ref().ok_or(PipelineError::ClosedQueue)?;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        select! {
            send(tx, item) -> res => res.map_err(|_| PipelineError::Disconnected),
            recv(cancel.signal()) -> _ => Err(PipelineError::Cancelled),
        }
    }

    /// Close this handle. Idempotent. Items already enqueued stay drainable.
    pub fn close(&mut self) {
        self.tx.take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}

impl<T> QueueReceiver<T> {
    /// Take the next item, blocking while the queue is empty and still open.
    pub fn take(&self, cancel: &CancelToken) -> Take<T> {
        if cancel.is_cancelled() {
            return Take::Cancelled;
        }
        select! {
            recv(self.rx) -> msg => match msg {
                Ok(item) => Take::Item(item),
                Err(_) => Take::Closed,
            },
            recv(cancel.signal()) -> _ => Take::Cancelled,
        }
    }

    /// Non-blocking take; None when empty (open or closed).
    pub fn try_take(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Items currently buffered.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.rx.capacity()
    }
}
