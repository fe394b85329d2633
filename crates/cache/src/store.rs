//! Entry table with last-access bookkeeping.
//!
//! The table is a concurrent map: individual get/insert/remove operations
//! need no external locking. Batch eviction (scanning for the
//! least-recently-used entry) is serialized one level up by the capacity
//! manager's admission lock, so two eviction passes can never race.
//!
//! Last-access stamps come from a monotonically increasing logical clock
//! rather than wall time, which makes LRU ordering strict and cheap.

use crate::disposal::DisposalExecutor;
use crate::events::CacheEvents;
use dashmap::DashMap;
use photo_viewer_decode::Bitmap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached images
    pub count: usize,

    /// Total pixel-data bytes held by the cache
    pub size_bytes: u64,
}

/// A cached image entry.
pub(crate) struct ImageEntry {
    bitmap: Arc<Bitmap>,
    size: u64,
    last_access: AtomicU64,
}

/// Concurrent key→entry table with size accounting.
pub(crate) struct EntryStore {
    entries: DashMap<PathBuf, ImageEntry>,
    size_bytes: AtomicU64,
    clock: AtomicU64,
    disposal: Arc<dyn DisposalExecutor>,
    events: CacheEvents,
}

impl EntryStore {
    pub(crate) fn new(disposal: Arc<dyn DisposalExecutor>) -> Self {
        Self {
            entries: DashMap::new(),
            size_bytes: AtomicU64::new(0),
            clock: AtomicU64::new(0),
            disposal,
            events: CacheEvents::new(),
        }
    }

    pub(crate) fn events(&self) -> &CacheEvents {
        &self.events
    }

    fn next_stamp(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Look up an entry, refreshing its last-access stamp on a hit.
    pub(crate) fn get(&self, key: &Path) -> Option<Arc<Bitmap>> {
        let entry = self.entries.get(key)?;
        entry.last_access.store(self.next_stamp(), Ordering::Relaxed);
        Some(entry.bitmap.clone())
    }

    /// Current last-access stamp for a key.
    #[cfg(test)]
    pub(crate) fn last_access(&self, key: &Path) -> Option<u64> {
        self.entries
            .get(key)
            .map(|e| e.last_access.load(Ordering::Relaxed))
    }

    /// Insert or replace an entry.
    ///
    /// A replaced bitmap goes to the disposal executor without a removal
    /// event; the key stays cached throughout, so observers only see the
    /// insert. Fires `(key, true)`.
    pub(crate) fn insert(&self, key: PathBuf, bitmap: Arc<Bitmap>, size: u64) {
        let entry = ImageEntry {
            bitmap,
            size,
            last_access: AtomicU64::new(self.next_stamp()),
        };
        self.size_bytes.fetch_add(size, Ordering::Relaxed);

        if let Some(old) = self.entries.insert(key.clone(), entry) {
            self.size_bytes.fetch_sub(old.size, Ordering::Relaxed);
            self.disposal.dispose(old.bitmap);
        }

        self.events.emit(&key, true);
    }

    /// Remove one entry, dispose its bitmap, fire `(key, false)`.
    pub(crate) fn remove(&self, key: &Path) -> bool {
        match self.entries.remove(key) {
            Some((key, entry)) => {
                self.size_bytes.fetch_sub(entry.size, Ordering::Relaxed);
                self.disposal.dispose(entry.bitmap);
                self.events.emit(&key, false);
                true
            }
            None => false,
        }
    }

    /// Remove the entry with the smallest last-access stamp.
    ///
    /// Returns the evicted key, or `None` when the store is empty. Must
    /// only be called under the capacity manager's admission lock.
    pub(crate) fn evict_oldest(&self) -> Option<PathBuf> {
        let mut oldest: Option<(PathBuf, u64)> = None;
        for entry in self.entries.iter() {
            let stamp = entry.last_access.load(Ordering::Relaxed);
            match &oldest {
                Some((_, best)) if *best <= stamp => {}
                _ => oldest = Some((entry.key().clone(), stamp)),
            }
        }

        let (key, _) = oldest?;
        log::debug!("evicting least-recently-used entry {:?}", key);
        self.remove(&key);
        Some(key)
    }

    /// Snapshot of all keys in ascending last-access order.
    ///
    /// Computed once per cleanup pass; both the count trim and the size
    /// trim walk this same ordering.
    pub(crate) fn lru_order(&self) -> Vec<PathBuf> {
        let mut stamped: Vec<(PathBuf, u64)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.last_access.load(Ordering::Relaxed)))
            .collect();
        stamped.sort_by_key(|(_, stamp)| *stamp);
        stamped.into_iter().map(|(key, _)| key).collect()
    }

    /// Remove every entry, disposing and notifying per key.
    pub(crate) fn clear(&self) {
        let keys: Vec<PathBuf> = self.entries.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.remove(&key);
        }
    }

    pub(crate) fn contains(&self, key: &Path) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn count(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn size_bytes(&self) -> u64 {
        self.size_bytes.load(Ordering::Relaxed)
    }

    /// Average entry size, if the store holds anything.
    pub(crate) fn average_entry_size(&self) -> Option<u64> {
        let count = self.count();
        if count == 0 {
            None
        } else {
            Some(self.size_bytes() / count as u64)
        }
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            count: self.count(),
            size_bytes: self.size_bytes(),
        }
    }
}
