//! The public image cache.
//!
//! [`ImageCache`] ties the pieces together: on a miss it estimates the
//! decoded size, asks the capacity manager for headroom, runs the decode
//! pipeline, and inserts the result. Hits refresh the entry's last-access
//! stamp and hand back the same shared bitmap.
//!
//! Concurrent misses on the same key are deduplicated through a per-key
//! in-flight lock, so a burst of requests for one file costs one decode.

use crate::capacity::{CapacityManager, Reservation};
use crate::config::CacheConfig;
use crate::disposal::{DisposalExecutor, DropDisposer};
use crate::estimator::estimate_size;
use crate::events::StatusListener;
use crate::store::{CacheStats, EntryStore};
use dashmap::DashMap;
use photo_viewer_decode::{
    Bitmap, DecodePipeline, ImageFile, MetadataProvider, NoMetadata, NoRawDecoder, RawDecoder,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;

/// Bounded-memory cache of decoded images with LRU eviction.
///
/// # Example
///
/// ```no_run
/// use photo_viewer_cache::{CacheConfig, ImageCache};
/// use photo_viewer_decode::DiskImageFile;
///
/// let cache = ImageCache::new(CacheConfig::default().with_max_size_mb(512));
/// let file = DiskImageFile::new("photo.jpg");
///
/// if let Some(bitmap) = cache.get_or_load(&file) {
///     println!("Displaying {}x{}", bitmap.width, bitmap.height);
/// }
/// ```
pub struct ImageCache {
    store: Arc<EntryStore>,
    capacity: Arc<CapacityManager>,
    config: Arc<RwLock<CacheConfig>>,
    metadata: Arc<dyn MetadataProvider>,
    pipeline: DecodePipeline,
    in_flight: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl ImageCache {
    /// Create a cache with default collaborators: no metadata reader, no
    /// raw codec, inline disposal.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(NoMetadata),
            Arc::new(NoRawDecoder),
            Arc::new(DropDisposer),
        )
    }

    /// Create a cache with explicit collaborators.
    pub fn with_collaborators(
        config: CacheConfig,
        metadata: Arc<dyn MetadataProvider>,
        raw: Arc<dyn RawDecoder>,
        disposal: Arc<dyn DisposalExecutor>,
    ) -> Self {
        let pipeline = DecodePipeline::new(raw, metadata.clone(), config.strip_alpha);
        Self {
            store: Arc::new(EntryStore::new(disposal)),
            capacity: Arc::new(CapacityManager::new()),
            config: Arc::new(RwLock::new(config)),
            metadata,
            pipeline,
            in_flight: DashMap::new(),
        }
    }

    /// Normalize a path into the cache key.
    ///
    /// Canonicalizes when the file exists so that differing spellings of
    /// one path share a single entry; otherwise the path is used as-is.
    fn normalize_key(path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }

    /// Return the cached bitmap for `file`, decoding on a miss.
    ///
    /// On a hit the entry's last-access stamp is refreshed and the same
    /// shared bitmap is returned. On a miss the image is decoded and
    /// inserted, with the entry sized by the actual decoded bitmap rather
    /// than the pre-decode estimate. Decode failures log a warning and
    /// yield `None` without inserting anything.
    pub fn get_or_load(&self, file: &dyn ImageFile) -> Option<Arc<Bitmap>> {
        let key = Self::normalize_key(file.path());

        if let Some(bitmap) = self.store.get(&key) {
            return Some(bitmap);
        }

        // One decode per key: later arrivals block here, then hit above.
        let gate = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let gate_held = gate.lock().unwrap();

        if let Some(bitmap) = self.store.get(&key) {
            drop(gate_held);
            self.in_flight.remove(&key);
            return Some(bitmap);
        }

        let config = self.config.read().unwrap().clone();
        let estimate = estimate_size(
            file,
            self.metadata.as_ref(),
            self.store.average_entry_size(),
            &config,
        );
        self.capacity.ensure_capacity(&self.store, &config, estimate);

        let result = match self.pipeline.decode(file) {
            Ok(bitmap) => {
                let size = bitmap.memory_size() as u64;
                let bitmap = Arc::new(bitmap);
                self.store.insert(key.clone(), bitmap.clone(), size);
                self.capacity.scheduled_cleanup(&self.store, &config);
                Some(bitmap)
            }
            Err(err) => {
                log::warn!("failed to decode '{}': {}", file.name(), err);
                None
            }
        };

        drop(gate_held);
        self.in_flight.remove(&key);
        result
    }

    /// Fire-and-forget load of `file` on a background thread.
    pub fn preload(self: &Arc<Self>, file: Arc<dyn ImageFile>) {
        let cache = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("photo-cache-preload".to_string())
            .spawn(move || {
                let _ = cache.get_or_load(file.as_ref());
            });
        if let Err(err) = spawned {
            log::warn!("failed to spawn preload thread: {}", err);
        }
    }

    /// Reserve budget for a speculative prefetch decode of `file`.
    ///
    /// Returns `None` when the estimate exceeds 60% of the memory budget;
    /// oversized speculative prefetch is refused by policy, not error.
    pub fn reserve_for_preload(&self, file: &dyn ImageFile) -> Option<Reservation> {
        let config = self.config.read().unwrap().clone();
        let estimate = estimate_size(
            file,
            self.metadata.as_ref(),
            self.store.average_entry_size(),
            &config,
        );
        self.capacity.reserve(&self.store, &config, estimate)
    }

    /// Reservation-gated load used by the prefetch coordinator.
    ///
    /// Already-cached files succeed immediately. A refused reservation
    /// skips the file. The reservation is held across the decode and
    /// released on every exit path.
    pub fn prefetch_one(&self, file: &dyn ImageFile) -> bool {
        let key = Self::normalize_key(file.path());
        if self.store.contains(&key) {
            return true;
        }

        let reservation = match self.reserve_for_preload(file) {
            Some(reservation) => reservation,
            None => return false,
        };
        let loaded = self.get_or_load(file).is_some();
        reservation.release();
        loaded
    }

    /// Whether a bitmap for `path` is currently cached.
    pub fn is_in_cache(&self, path: &Path) -> bool {
        self.store.contains(&Self::normalize_key(path))
    }

    /// Explicitly evict one entry. Returns whether it existed.
    pub fn remove(&self, path: &Path) -> bool {
        self.store.remove(&Self::normalize_key(path))
    }

    /// Evict everything, firing one status event per entry.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Current entry count and byte total.
    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    /// Bytes reserved by in-flight prefetch decodes.
    pub fn reserved_bytes(&self) -> u64 {
        self.capacity.reserved_bytes()
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> CacheConfig {
        self.config.read().unwrap().clone()
    }

    /// Change the entry ceiling; triggers an asynchronous cleanup pass.
    pub fn set_max_count(&self, max_count: usize) {
        self.config.write().unwrap().max_count = max_count;
        self.spawn_cleanup();
    }

    /// Change the memory ceiling; triggers an asynchronous cleanup pass.
    pub fn set_max_size(&self, max_size: u64) {
        self.config.write().unwrap().max_size = max_size;
        self.spawn_cleanup();
    }

    /// Run a cleanup pass on the calling thread.
    ///
    /// The asynchronous pass spawned by the setters calls this; callers
    /// that need the trim to have happened (shutdown, tests) can invoke
    /// it directly.
    pub fn cleanup_now(&self) {
        let config = self.config.read().unwrap().clone();
        self.capacity.scheduled_cleanup(&self.store, &config);
    }

    /// Subscribe to `(path, is_now_cached)` status events.
    pub fn on_status_changed(&self, listener: StatusListener) {
        self.store.events().subscribe(listener);
    }

    fn spawn_cleanup(&self) {
        let store = self.store.clone();
        let capacity = self.capacity.clone();
        let config = self.config.clone();
        let spawned = thread::Builder::new()
            .name("photo-cache-cleanup".to_string())
            .spawn(move || {
                let snapshot = config.read().unwrap().clone();
                capacity.scheduled_cleanup(&store, &snapshot);
            });
        if let Err(err) = spawned {
            log::warn!("failed to spawn cleanup thread: {}", err);
        }
    }
}
