//! Hold-to-confirm gate for destructive actions.
//!
//! Model removal only proceeds after the user keeps the trigger pressed for a
//! full countdown; releasing early cancels the pending removal with no state
//! change and no backend call. This is a timing guard layered in front of the
//! orchestrator's predicate guard, not a replacement for it.

use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// How long the removal trigger must be held continuously.
pub const REMOVE_HOLD: Duration = Duration::from_secs(2);

pub struct HoldGate {
    duration: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl HoldGate {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            pending: Mutex::new(None),
        }
    }

    /// Begin a hold. Resolves `true` once the full duration elapsed with no
    /// release, `false` if [`HoldGate::release`] was called first. A new
    /// press supersedes any pending one.
    pub async fn press(&self) -> bool {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending.lock().unwrap().replace(token.clone()) {
            previous.cancel();
        }

        tokio::select! {
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(self.duration) => {
                self.pending.lock().unwrap().take();
                true
            }
        }
    }

    /// Release the trigger early, cancelling the pending press.
    pub fn release(&self) {
        if let Some(token) = self.pending.lock().unwrap().take() {
            token.cancel();
        }
    }
}
