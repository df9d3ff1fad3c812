//! Content pipeline: what the user is typing vs. what should be rendered.
//!
//! `immediate` is authoritative and updates synchronously on every write;
//! `debounced` is the time-lagged copy that drives re-rendering. Interactive
//! typing reaches `debounced` only after a quiet interval; backend-produced
//! text and clears bypass the debounce entirely.

mod debounce;

pub use debounce::Debouncer;

use std::sync::Arc;
use std::time::Duration;

use crate::store::Store;

/// Quiet interval before an interactive edit reaches the render buffer.
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(250);

pub struct ContentStore {
    immediate: Store<String>,
    debounced: Arc<Store<String>>,
    debouncer: Debouncer,
}

impl ContentStore {
    pub fn new() -> Self {
        Self {
            immediate: Store::new(String::new()),
            debounced: Arc::new(Store::new(String::new())),
            debouncer: Debouncer::new(DEBOUNCE_INTERVAL),
        }
    }

    /// Write the buffer. `immediate` always updates synchronously.
    ///
    /// With `direct` (backend output, clearing) `debounced` updates in the
    /// same tick and any pending trailing write is dropped, so no stale value
    /// can overwrite it later. Without it (typing) a trailing write is
    /// scheduled; writes within the quiet interval restart the timer.
    pub fn set_content(&self, value: impl Into<String>, direct: bool) {
        let value = value.into();
        self.immediate.set(value.clone());
        if direct {
            self.debouncer.cancel();
            self.debounced.set(value);
        } else {
            let debounced = Arc::clone(&self.debounced);
            self.debouncer.schedule(move || debounced.set(value));
        }
    }

    pub fn immediate(&self) -> String {
        self.immediate.get()
    }

    pub fn debounced(&self) -> String {
        self.debounced.get()
    }

    /// Drives the editable view.
    pub fn subscribe_immediate(&self, f: impl Fn(&String) + Send + 'static) {
        self.immediate.subscribe(f);
    }

    /// Drives re-rendering; this is the only render trigger.
    pub fn subscribe_debounced(&self, f: impl Fn(&String) + Send + 'static) {
        self.debounced.subscribe(f);
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn render_probe(store: &ContentStore) -> (Arc<AtomicUsize>, Arc<Mutex<Vec<String>>>) {
        let fires = Arc::new(AtomicUsize::new(0));
        let values = Arc::new(Mutex::new(Vec::new()));
        let counter = fires.clone();
        let sink = values.clone();
        store.subscribe_debounced(move |v: &String| {
            counter.fetch_add(1, Ordering::SeqCst);
            sink.lock().unwrap().push(v.clone());
        });
        (fires, values)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_coalesce_to_the_last_value() {
        let store = ContentStore::new();
        let (fires, values) = render_probe(&store);

        store.set_content("abc", false);
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.set_content("abcd", false);

        assert_eq!(store.immediate(), "abcd");
        assert_eq!(store.debounced(), "");

        // 250ms counted from the second write, not the first.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.debounced(), "");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.debounced(), "abcd");
        assert_eq!(fires.load(Ordering::SeqCst), 1);
        assert_eq!(*values.lock().unwrap(), vec!["abcd".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn direct_write_is_synchronous_and_final() {
        let store = ContentStore::new();
        let (fires, _values) = render_probe(&store);

        // A pending interactive write must not fire later with a stale value.
        store.set_content("typed", false);
        store.set_content("X", true);

        assert_eq!(store.immediate(), "X");
        assert_eq!(store.debounced(), "X");

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.debounced(), "X");
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn interactive_write_lands_after_the_quiet_period() {
        let store = ContentStore::new();

        store.set_content("hello", false);
        assert_eq!(store.immediate(), "hello");
        assert_eq!(store.debounced(), "");

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.debounced(), "hello");
    }
}
