//! Model file availability mirrored from the backend.
//!
//! The backend owns the truth about which model files exist on disk; this
//! store holds the most recently pulled copy. `all_present` is the derived
//! conjunction the lifecycle machine keys on.

use crate::backend::{FileKind, FileStatus};
use crate::store::Store;

pub struct ModelAvailability {
    status: Store<FileStatus>,
}

impl ModelAvailability {
    pub fn new() -> Self {
        Self {
            status: Store::new(FileStatus::default()),
        }
    }

    pub fn get(&self) -> FileStatus {
        self.status.get()
    }

    /// Replace the mirrored status with a fresh pull from the backend.
    pub fn set(&self, status: FileStatus) {
        self.status.set(status);
    }

    pub fn has(&self, kind: FileKind) -> bool {
        self.status.get().has(kind)
    }

    /// True iff encoder, decoder and tokenizer are all on disk.
    pub fn all_present(&self) -> bool {
        self.status.get().all_present()
    }

    pub fn subscribe(&self, f: impl Fn(&FileStatus) + Send + 'static) {
        self.status.subscribe(f);
    }
}

impl Default for ModelAvailability {
    fn default() -> Self {
        Self::new()
    }
}
