//! Trailing-edge debouncer.
//!
//! One pending fire at a time: scheduling while a fire is pending supersedes
//! it (the timer is reset, not stacked), so the callback runs at most once
//! per quiet period, with whatever was scheduled last.

use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub struct Debouncer {
    interval: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `f` to run after the quiet interval, cancelling any pending
    /// schedule. Must be called from within a tokio runtime.
    pub fn schedule(&self, f: impl FnOnce() + Send + 'static) {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending.lock().unwrap().replace(token.clone()) {
            previous.cancel();
        }

        let interval = self.interval;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(interval) => f(),
            }
        });
    }

    /// Drop any pending schedule without running it.
    pub fn cancel(&self) {
        if let Some(token) = self.pending.lock().unwrap().take() {
            token.cancel();
        }
    }
}
