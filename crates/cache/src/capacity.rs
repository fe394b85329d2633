//! Capacity management and admission control.
//!
//! The capacity manager decides whether a decode may proceed and evicts
//! least-recently-used entries to make room. All capacity decisions run
//! under a single admission lock: concurrent eviction scans could
//! otherwise double-evict. What counts against the ceiling is
//! `current_size + reserved + incoming`, where `reserved` tracks
//! speculative prefetch decodes that have not landed in the store yet.

use crate::config::CacheConfig;
use crate::store::EntryStore;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Fraction of `max_size` used as the eviction target and as the stricter
/// bar for "too large" requests.
const SAFE_LIMIT_FRACTION: f64 = 0.8;

/// Requests above this fraction of `max_size` are considered too large to
/// share the cache politely.
const OVERSIZE_FRACTION: f64 = 0.6;

/// A provisional claim on the memory budget for an in-flight prefetch
/// decode.
///
/// Releasing is idempotent: explicit [`release`](Reservation::release)
/// and `Drop` together decrement the reserved counter exactly once, on
/// every exit path including failure.
pub struct Reservation {
    reserved: Arc<AtomicU64>,
    amount: u64,
    released: AtomicBool,
}

impl Reservation {
    fn new(reserved: Arc<AtomicU64>, amount: u64) -> Self {
        reserved.fetch_add(amount, Ordering::Relaxed);
        Self {
            reserved,
            amount,
            released: AtomicBool::new(false),
        }
    }

    /// Reserved byte count.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Return the reserved bytes to the budget. Safe to call more than
    /// once; only the first call decrements.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.reserved.fetch_sub(self.amount, Ordering::Relaxed);
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.release();
    }
}

/// Serializes eviction decisions and tracks speculative reservations.
pub(crate) struct CapacityManager {
    reserved: Arc<AtomicU64>,
    admission: Mutex<()>,
}

impl CapacityManager {
    pub(crate) fn new() -> Self {
        Self {
            reserved: Arc::new(AtomicU64::new(0)),
            admission: Mutex::new(()),
        }
    }

    /// Bytes currently reserved by in-flight prefetch decodes.
    pub(crate) fn reserved_bytes(&self) -> u64 {
        self.reserved.load(Ordering::Relaxed)
    }

    fn safe_limit(config: &CacheConfig) -> u64 {
        (config.max_size as f64 * SAFE_LIMIT_FRACTION) as u64
    }

    fn oversize_threshold(config: &CacheConfig) -> u64 {
        (config.max_size as f64 * OVERSIZE_FRACTION) as u64
    }

    /// The ceiling a request of `need` bytes is held against.
    ///
    /// A request bigger than 60% of the budget is held to the 80% safe
    /// limit so one huge image does not monopolize the cache; everything
    /// else is held to the full budget.
    fn applicable_limit(config: &CacheConfig, need: u64) -> u64 {
        if need > Self::oversize_threshold(config) {
            Self::safe_limit(config)
        } else {
            config.max_size
        }
    }

    /// Evict least-recently-used entries until `need` more bytes fit.
    ///
    /// Admission check: `current + reserved + need` against the
    /// applicable limit. Stops when under the limit or the store is
    /// empty.
    pub(crate) fn ensure_capacity(&self, store: &EntryStore, config: &CacheConfig, need: u64) {
        let _admission = self.admission.lock().unwrap();
        let limit = Self::applicable_limit(config, need);

        while store.size_bytes() + self.reserved_bytes() + need > limit {
            if store.evict_oldest().is_none() {
                break;
            }
        }
    }

    /// Reserve budget for a speculative prefetch decode.
    ///
    /// Refuses outright (no token, no counter change) when the estimate
    /// exceeds 60% of the budget; oversized speculative work is not worth
    /// the eviction churn.
    pub(crate) fn reserve(
        &self,
        store: &EntryStore,
        config: &CacheConfig,
        estimate: u64,
    ) -> Option<Reservation> {
        if estimate > Self::oversize_threshold(config) {
            log::trace!(
                "refusing prefetch reservation of {} bytes (over {} byte threshold)",
                estimate,
                Self::oversize_threshold(config)
            );
            return None;
        }

        let _admission = self.admission.lock().unwrap();
        let limit = Self::applicable_limit(config, estimate);
        while store.size_bytes() + self.reserved_bytes() + estimate > limit {
            if store.evict_oldest().is_none() {
                break;
            }
        }

        Some(Reservation::new(self.reserved.clone(), estimate))
    }

    /// Trim the store back under the configured ceilings.
    ///
    /// Runs after every insert and after configuration changes. One LRU
    /// ordering is computed per pass and shared by both trims: (a) count
    /// down to `max_count`, (b) size down to the 80% safe limit, keeping
    /// the most recently used entries.
    pub(crate) fn scheduled_cleanup(&self, store: &EntryStore, config: &CacheConfig) {
        let _admission = self.admission.lock().unwrap();
        let order = store.lru_order();
        let mut next = 0;

        while store.count() > config.max_count && next < order.len() {
            store.remove(&order[next]);
            next += 1;
        }

        let target = Self::safe_limit(config);
        while store.size_bytes() > target && next < order.len() {
            store.remove(&order[next]);
            next += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposal::DropDisposer;
    use photo_viewer_decode::{Bitmap, PixelFormat};
    use std::path::PathBuf;

    fn store() -> EntryStore {
        EntryStore::new(Arc::new(DropDisposer))
    }

    fn insert(store: &EntryStore, name: &str, bytes: u64) {
        let width = (bytes / 3) as u32;
        let bitmap = Arc::new(Bitmap::new(
            PixelFormat::Rgb8,
            width,
            1,
            vec![0u8; width as usize * 3],
        ));
        store.insert(PathBuf::from(format!("/photos/{}", name)), bitmap, bytes);
    }

    fn config(max_count: usize, max_size: u64) -> CacheConfig {
        CacheConfig::new(max_count, max_size)
    }

    #[test]
    fn test_ensure_capacity_evicts_lru_first() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(10, 1000);

        insert(&store, "a.jpg", 300);
        insert(&store, "b.jpg", 300);
        insert(&store, "c.jpg", 300);
        store.get(&PathBuf::from("/photos/a.jpg"));

        // 900 used, need 300 more: evict until 300 fits under 1000
        manager.ensure_capacity(&store, &config, 300);

        assert!(!store.contains(&PathBuf::from("/photos/b.jpg")));
        assert!(!store.contains(&PathBuf::from("/photos/c.jpg")));
        assert!(store.contains(&PathBuf::from("/photos/a.jpg")));
    }

    #[test]
    fn test_ensure_capacity_counts_reservations() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(10, 1000);

        insert(&store, "a.jpg", 300);
        let _reservation = manager.reserve(&store, &config, 500).unwrap();

        // 300 stored + 500 reserved + 300 incoming > 1000: a.jpg must go
        manager.ensure_capacity(&store, &config, 300);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_oversized_request_held_to_safe_limit() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(10, 1000);

        insert(&store, "a.jpg", 150);

        // need = 700 > 60% of 1000, so the limit is 800 not 1000;
        // 150 + 700 > 800 forces the eviction of a.jpg
        manager.ensure_capacity(&store, &config, 700);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_normal_request_held_to_full_limit() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(10, 1000);

        insert(&store, "a.jpg", 450);

        // need = 500 <= 60% of 1000; 450 + 500 <= 1000, nothing evicted
        manager.ensure_capacity(&store, &config, 500);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_ensure_capacity_stops_on_empty_store() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(10, 100);

        // Impossible request terminates without spinning
        manager.ensure_capacity(&store, &config, 10_000);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_reserve_and_release_conserve_counter() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(10, 1000);

        assert_eq!(manager.reserved_bytes(), 0);
        let reservation = manager.reserve(&store, &config, 400).unwrap();
        assert_eq!(manager.reserved_bytes(), 400);

        reservation.release();
        assert_eq!(manager.reserved_bytes(), 0);
    }

    #[test]
    fn test_release_is_idempotent() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(10, 1000);

        let reservation = manager.reserve(&store, &config, 400).unwrap();
        reservation.release();
        reservation.release();
        drop(reservation); // Drop also releases

        // Never goes negative / double-decrements
        assert_eq!(manager.reserved_bytes(), 0);
    }

    #[test]
    fn test_drop_releases() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(10, 1000);

        {
            let _reservation = manager.reserve(&store, &config, 400).unwrap();
            assert_eq!(manager.reserved_bytes(), 400);
        }
        assert_eq!(manager.reserved_bytes(), 0);
    }

    #[test]
    fn test_oversized_reservation_refused() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(10, 1000);

        // 601 > 60% of 1000
        assert!(manager.reserve(&store, &config, 601).is_none());
        assert_eq!(manager.reserved_bytes(), 0);

        // 600 is exactly at the threshold and allowed
        let reservation = manager.reserve(&store, &config, 600).unwrap();
        assert_eq!(manager.reserved_bytes(), 600);
        drop(reservation);
    }

    #[test]
    fn test_scheduled_cleanup_trims_count() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(2, 1_000_000);

        insert(&store, "a.jpg", 300);
        insert(&store, "b.jpg", 300);
        insert(&store, "c.jpg", 300);
        insert(&store, "d.jpg", 300);

        manager.scheduled_cleanup(&store, &config);

        assert_eq!(store.count(), 2);
        // The two most recently inserted survive
        assert!(store.contains(&PathBuf::from("/photos/c.jpg")));
        assert!(store.contains(&PathBuf::from("/photos/d.jpg")));
    }

    #[test]
    fn test_scheduled_cleanup_trims_size_to_safe_limit() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(100, 1000);

        for i in 0..5 {
            insert(&store, &format!("{}.jpg", i), 300);
        }
        // 1500 used; safe limit is 800

        manager.scheduled_cleanup(&store, &config);

        assert!(store.size_bytes() <= 800);
        // Most recently used kept
        assert!(store.contains(&PathBuf::from("/photos/4.jpg")));
        assert!(store.contains(&PathBuf::from("/photos/3.jpg")));
    }

    #[test]
    fn test_cleanup_converges_under_repeated_insert() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(3, 1_000_000);

        for i in 0..20 {
            insert(&store, &format!("{}.jpg", i), 300);
            manager.scheduled_cleanup(&store, &config);
            assert!(store.count() <= 3, "count exceeded after insert {}", i);
        }
    }

    #[test]
    fn test_forced_eviction_removes_k_smallest_stamps() {
        let store = store();
        let manager = CapacityManager::new();
        let config = config(10, 3000);

        // Strictly increasing stamps by insertion order
        for i in 0..10 {
            insert(&store, &format!("{}.jpg", i), 300);
        }

        // Need 900 → exactly 3 evictions, the 3 oldest
        manager.ensure_capacity(&store, &config, 900);

        for i in 0..3 {
            assert!(!store.contains(&PathBuf::from(format!("/photos/{}.jpg", i))));
        }
        for i in 3..10 {
            assert!(store.contains(&PathBuf::from(format!("/photos/{}.jpg", i))));
        }
    }

    #[test]
    fn test_random_access_pattern_respects_lru() {
        use rand::seq::SliceRandom;

        let store = store();
        let manager = CapacityManager::new();
        let config = config(100, 30_000);

        for i in 0..100 {
            insert(&store, &format!("{}.jpg", i), 300);
        }

        // Touch a random half; the untouched half must be evicted first
        let mut indices: Vec<usize> = (0..100).collect();
        indices.shuffle(&mut rand::thread_rng());
        let touched: Vec<usize> = indices.into_iter().take(50).collect();
        for &i in &touched {
            store.get(&PathBuf::from(format!("/photos/{}.jpg", i)));
        }

        // Evict exactly 50 entries (15000 bytes of headroom needed)
        manager.ensure_capacity(&store, &config, 15_000);

        for &i in &touched {
            assert!(
                store.contains(&PathBuf::from(format!("/photos/{}.jpg", i))),
                "touched entry {} was evicted",
                i
            );
        }
    }
}
