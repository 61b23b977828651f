use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// StopSignal
// ---------------------------------------------------------------------------

/// Broadcast-based stop coordinator for the daemon loop.
///
/// The supervisor subscribes once and `select!`s on the returned receiver
/// alongside its interval timer; the signal handler calls `request_stop()`.
/// The flag can also be polled cheaply at loop boundaries.
///
/// ```ignore
/// let stop = StopSignal::new();
/// let mut rx = stop.subscribe();
///
/// tokio::select! {
///     _ = rx.recv() => { /* flush and exit */ }
///     _ = interval.tick() => { /* next cycle */ }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StopSignal {
    /// Broadcast sender; one message wakes every subscriber.
    tx: broadcast::Sender<()>,
    /// Atomic flag for polling without an await point.
    requested: Arc<AtomicBool>,
    /// Watch channel counting workers that finished their teardown.
    finished_tx: Arc<watch::Sender<usize>>,
    finished_rx: watch::Receiver<usize>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        let (finished_tx, finished_rx) = watch::channel(0);
        Self {
            tx,
            requested: Arc::new(AtomicBool::new(false)),
            finished_tx: Arc::new(finished_tx),
            finished_rx,
        }
    }

    /// Subscribe to the stop broadcast.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Whether a stop has been requested (non-blocking).
    pub fn stop_requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }

    /// Request a stop. Idempotent; only the first call broadcasts.
    pub fn request_stop(&self) {
        if self
            .requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            info!("stop requested");
            let _ = self.tx.send(());
        } else {
            warn!("stop already requested");
        }
    }

    /// Record that one worker has completed its teardown.
    pub fn confirm_finished(&self) {
        self.finished_tx.send_modify(|count| *count += 1);
    }

    /// Wait until `expected` workers confirm teardown or the timeout expires.
    pub async fn wait_for_finish(&mut self, expected: usize, timeout: Duration) -> FinishResult {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let current = *self.finished_rx.borrow();
            if current >= expected {
                info!(count = current, "all workers finished");
                return FinishResult::Complete(current);
            }

            match tokio::time::timeout_at(deadline, self.finished_rx.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) => {
                    // Sender side dropped; nothing more will confirm.
                    let current = *self.finished_rx.borrow();
                    return FinishResult::Complete(current);
                }
                Err(_) => {
                    let current = *self.finished_rx.borrow();
                    warn!(current, expected, "timed out waiting for workers to finish");
                    return FinishResult::Timeout {
                        confirmed: current,
                        expected,
                    };
                }
            }
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// FinishResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishResult {
    /// Every expected worker confirmed teardown.
    Complete(usize),
    /// The grace period expired first.
    Timeout { confirmed: usize, expected: usize },
}

impl FinishResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, FinishResult::Complete(_))
    }
}

// ---------------------------------------------------------------------------
// StopGuard
// ---------------------------------------------------------------------------

/// RAII guard that confirms teardown when dropped.
///
/// The supervisor task holds one for its whole run; dropping it (normal
/// return or panic unwind) tells `wait_for_finish` that the loop is gone.
pub struct StopGuard {
    signal: StopSignal,
}

impl StopGuard {
    pub fn new(signal: StopSignal) -> Self {
        Self { signal }
    }
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        self.signal.confirm_finished();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
