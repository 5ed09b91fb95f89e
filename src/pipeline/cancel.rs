//! Cancellation signal shared by the dispatcher, workers and collector, plus the optional deadline timer.
//!
//! The signal is a channel whose only sender is dropped on cancel. Blocking queue operations
//! `select!` on it next to their own channel, so a waiter wakes the moment the signal fires
//! instead of polling a flag.

use crossbeam_channel::{Receiver, Sender, after, bounded, select};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::{CancelReason, PipelineError};

struct CancelInner {
    cancelled: AtomicBool,
    reason: OnceLock<CancelReason>,
    /// Dropped on cancel; disconnecting `signal_rx` wakes every `select!` waiting on it.
    signal_tx: Mutex<Option<Sender<()>>>,
    signal_rx: Receiver<()>,
}

/// Single-fire, broadcast cancellation signal. Clones share the same signal.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (signal_tx, signal_rx) = bounded::<()>(0);
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                reason: OnceLock::new(),
                signal_tx: Mutex::new(Some(signal_tx)),
                signal_rx,
            }),
        }
    }

    /// Cancel with [`CancelReason::Requested`]. Idempotent.
    pub fn cancel(&self) -> bool {
        self.cancel_with(CancelReason::Requested)
    }

    /// Set the signal. Returns true only for the call that actually fired it; the first reason wins.
    pub fn cancel_with(&self, reason: CancelReason) -> bool {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.inner.reason.set(reason);
        let sender = self
            .inner
            .signal_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        drop(sender);
        debug!("cancellation signal fired ({:?})", reason);
        true
    }

    /// Non-blocking check. Never reverts to false once set.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.reason.get().copied()
    }

    /// Receiver that becomes ready (disconnected) when the signal fires. Use in `select!`.
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal_rx
    }

    /// Block until cancelled or `timeout` elapses. Returns true if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        select! {
            recv(self.signal()) -> _ => true,
            default(timeout) => self.is_cancelled(),
        }
    }

    /// Arm an automatic cancel after `deadline`. Dropping the returned guard disarms it.
    pub fn with_deadline(&self, deadline: Duration) -> Result<DeadlineGuard, PipelineError> {
        let (disarm_tx, disarm_rx) = bounded::<()>(0);
        let state = Arc::new(Mutex::new(DeadlineState::Armed));
        let token = self.clone();
        let timer_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name("workpipe-deadline".to_string())
            .spawn(move || {
                let timer = after(deadline);
                select! {
                    recv(timer) -> _ => {
                        // Fire under the lock so a concurrent disarm sees either Armed or Fired.
                        let mut state = lock_state(&timer_state);
                        if *state == DeadlineState::Armed {
                            *state = DeadlineState::Fired;
                            if token.cancel_with(CancelReason::Deadline) {
                                warn!("deadline of {:?} elapsed; cancelling", deadline);
                            }
                        }
                    }
                    recv(disarm_rx) -> _ => {}
                    recv(token.signal()) -> _ => {}
                }
            })
            .map_err(|source| PipelineError::Spawn {
                role: "deadline",
                source,
            })?;
        Ok(DeadlineGuard {
            state,
            disarm_tx: Some(disarm_tx),
            handle: Some(handle),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeadlineState {
    Armed,
    Disarmed,
    Fired,
}

fn lock_state(state: &Mutex<DeadlineState>) -> std::sync::MutexGuard<'_, DeadlineState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Armed deadline. Dropping it disarms the timer and joins the timer thread.
pub struct DeadlineGuard {
    state: Arc<Mutex<DeadlineState>>,
    disarm_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl DeadlineGuard {
    /// Stop the timer from firing without joining it. Returns false if the deadline already fired.
    /// Once this returns true the deadline can never cancel.
    pub fn try_disarm(&self) -> bool {
        let mut state = lock_state(&self.state);
        match *state {
            DeadlineState::Fired => false,
            DeadlineState::Armed | DeadlineState::Disarmed => {
                *state = DeadlineState::Disarmed;
                true
            }
        }
    }

    /// Disarm now. Same as dropping the guard.
    pub fn disarm(self) {}
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.try_disarm();
        drop(self.disarm_tx.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
