//! Cache status change notifications.
//!
//! Subscribers receive `(path, is_now_cached)` for every insert and every
//! removal. The UI uses this to annotate which thumbnails are currently
//! warm. Callbacks run on whatever thread performed the cache mutation,
//! so they must be quick and must not call back into the cache.

use std::path::Path;
use std::sync::Mutex;

/// Callback invoked on cache status changes.
pub type StatusListener = Box<dyn Fn(&Path, bool) + Send + Sync>;

/// Observer list for cache-status-changed events.
#[derive(Default)]
pub struct CacheEvents {
    listeners: Mutex<Vec<StatusListener>>,
}

impl CacheEvents {
    /// Create an event list with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners cannot be removed individually;
    /// they live as long as the cache.
    pub fn subscribe(&self, listener: StatusListener) {
        self.listeners.lock().unwrap().push(listener);
    }

    /// Notify all listeners that `path` is now cached or no longer cached.
    pub fn emit(&self, path: &Path, is_now_cached: bool) {
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.iter() {
            listener(path, is_now_cached);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}
