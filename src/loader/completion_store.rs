//! A thread-safe, name-keyed handoff point between a disk job and the
//! main-thread upload job waiting on its [`super::SyncPoint`] (§4.5).
//!
//! Mirrors the teacher's `MeshLoadingStorage` (mutex-protected
//! `StoreCompletedLoad`/`RetrieveCompletedLoad`), generalised to any
//! resource definition type.

use std::collections::HashMap;
use std::sync::Mutex;

pub struct CompletionStore<T> {
    entries: Mutex<HashMap<String, T>>,
}

impl<T> CompletionStore<T> {
    pub fn new() -> Self {
        CompletionStore {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Deposit a completed load's decoded value, keyed by resource name.
    pub fn put(&self, name: impl Into<String>, value: T) {
        self.entries.lock().unwrap().insert(name.into(), value);
    }

    /// Remove and return a completed load's value, if present.
    pub fn take(&self, name: &str) -> Option<T> {
        self.entries.lock().unwrap().remove(name)
    }
}

impl<T> Default for CompletionStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
