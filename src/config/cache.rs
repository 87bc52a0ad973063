//! Path-keyed cache of parsed sources
//!
//! One cache instance is shared by every [`Loader`](super::loader::Loader)
//! that reads the same kind of source. Entries live until they are evicted
//! explicitly; there is no expiry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cache of parsed sources keyed by resolved absolute path
#[derive(Debug)]
pub struct SourceCache<T> {
    entries: Mutex<HashMap<PathBuf, Arc<T>>>,
}

impl<T> SourceCache<T> {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an empty cache ready to be shared between loaders
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the cached value for `path`
    pub fn get(&self, path: &Path) -> Option<Arc<T>> {
        self.lock().get(path).cloned()
    }

    /// Stores `value` under `path`, replacing any previous entry
    pub fn insert(&self, path: PathBuf, value: Arc<T>) {
        self.lock().insert(path, value);
    }

    /// Removes the entry for `path`; returns whether one existed
    pub fn evict(&self, path: &Path) -> bool {
        self.lock().remove(path).is_some()
    }

    /// Returns whether `path` is cached
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    /// Number of cached sources
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether the cache holds nothing
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<T>>> {
        // A panic while holding the lock cannot leave a half-written map behind.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T> Default for SourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
