//! Scoped, cancellable one-shot timers.

use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle, time};

/// Holds at most one pending one-shot timer.
///
/// Scheduling replaces (and aborts) the previous timer; dropping the slot
/// aborts whatever is pending.
#[derive(Debug, Default)]
pub struct TimerSlot {
    pending: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `msg` on `tx` once `delay` has elapsed.
    pub fn schedule<T: Send + 'static>(
        &mut self,
        delay: Duration,
        tx: mpsc::UnboundedSender<T>,
        msg: T,
    ) {
        self.cancel();
        self.pending = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            // Receiver gone means the owner shut down.
            let _ = tx.send(msg);
        }));
    }

    /// Aborts the pending timer, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a timer was scheduled and has not yet fired or been cancelled.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
