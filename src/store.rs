//! Shared state containers with a subscription interface.
//!
//! Every piece of state the UI observes lives in a [`Store`]: a typed value
//! behind a mutex plus a list of subscriber callbacks. Components never hold
//! a mutable reference to shared state; all writes go through [`Store::set`],
//! which notifies subscribers only when the value actually changed.

use std::sync::Mutex;

type Subscriber<T> = Box<dyn Fn(&T) + Send>;

pub struct Store<T> {
    value: Mutex<T>,
    subscribers: Mutex<Vec<Subscriber<T>>>,
}

impl<T: Clone + PartialEq> Store<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: Mutex::new(initial),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Current value (cloned out so no lock is held by the caller).
    pub fn get(&self) -> T {
        self.value.lock().unwrap().clone()
    }

    /// Write a new value and notify subscribers.
    ///
    /// Writing a value equal to the current one is a no-op: subscribers are
    /// not called, matching the change-only semantics the view layer expects.
    pub fn set(&self, value: T) {
        {
            let mut current = self.value.lock().unwrap();
            if *current == value {
                return;
            }
            *current = value.clone();
        }
        self.notify(&value);
    }

    /// Register a callback invoked after every effective write.
    ///
    /// Callbacks run on the writer's task, outside the value lock, so they
    /// may read the store but must not block.
    pub fn subscribe(&self, f: impl Fn(&T) + Send + 'static) {
        self.subscribers.lock().unwrap().push(Box::new(f));
    }

    fn notify(&self, value: &T) {
        for subscriber in self.subscribers.lock().unwrap().iter() {
            subscriber(value);
        }
    }
}
