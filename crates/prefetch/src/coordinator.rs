//! Background prefetch coordination
//!
//! The coordinator turns navigation events into speculative cache
//! loads. Two intents exist: neighbours of the current image (browsing
//! forward and back) and the settled visible thumbnail range. Each
//! intent holds one cancellation token; a newer event for the same
//! intent cancels the run in progress before starting its own.

use crate::activity::LoadActivity;
use crate::cancel::CancellationToken;
use crate::candidates::{around_candidates, visible_candidates};
use photo_viewer_cache::ImageCache;
use photo_viewer_decode::ImageFile;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;

/// Tuning knobs for prefetch behavior.
///
/// # Example
///
/// ```
/// use photo_viewer_prefetch::PrefetchConfig;
///
/// let config = PrefetchConfig::default()
///     .with_forward_count(8)
///     .with_throttle(std::time::Duration::from_millis(20));
/// assert_eq!(config.forward_count, 8);
/// ```
#[derive(Debug, Clone)]
pub struct PrefetchConfig {
    /// Images ahead of the current one to prefetch
    pub forward_count: usize,

    /// Images behind the current one to prefetch
    pub backward_count: usize,

    /// How often a pending run re-checks viewer idleness
    pub poll_interval: Duration,

    /// Longest a run waits for idleness before proceeding anyway
    pub idle_ceiling: Duration,

    /// Pause between consecutive prefetch decodes
    pub throttle: Duration,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            forward_count: 5,
            backward_count: 2,
            poll_interval: Duration::from_millis(120),
            idle_ceiling: Duration::from_secs(5),
            throttle: Duration::from_millis(40),
        }
    }
}

impl PrefetchConfig {
    pub fn with_forward_count(mut self, count: usize) -> Self {
        self.forward_count = count;
        self
    }

    pub fn with_backward_count(mut self, count: usize) -> Self {
        self.backward_count = count;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_idle_ceiling(mut self, ceiling: Duration) -> Self {
        self.idle_ceiling = ceiling;
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }
}

/// Ordered collection of images the viewer is browsing.
pub trait ImageList: Send + Sync {
    fn len(&self) -> usize;

    /// The file at `index`, or `None` if the list changed underneath.
    fn file_at(&self, index: usize) -> Option<Arc<dyn ImageFile>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Turns navigation events into cancellable background prefetch runs.
///
/// Runs drain on their own threads, but never two at once: a shared
/// busy flag serializes queue drains across both intents, and within a
/// drain every candidate waits for the viewer to go idle before its
/// decode, with a throttle between decodes. Foreground work keeps
/// priority on the decode path throughout.
pub struct PrefetchCoordinator {
    cache: Arc<ImageCache>,
    activity: Arc<LoadActivity>,
    config: PrefetchConfig,
    around_token: Mutex<CancellationToken>,
    visible_token: Mutex<CancellationToken>,
    busy: AtomicBool,
    active_runs: AtomicUsize,
}

impl PrefetchCoordinator {
    pub fn new(cache: Arc<ImageCache>, activity: Arc<LoadActivity>, config: PrefetchConfig) -> Self {
        Self {
            cache,
            activity,
            config,
            around_token: Mutex::new(CancellationToken::new()),
            visible_token: Mutex::new(CancellationToken::new()),
            busy: AtomicBool::new(false),
            active_runs: AtomicUsize::new(0),
        }
    }

    /// The activity record foreground loads should report into.
    pub fn activity(&self) -> &Arc<LoadActivity> {
        &self.activity
    }

    /// Whether any prefetch run is currently draining.
    pub fn is_busy(&self) -> bool {
        self.active_runs.load(Ordering::SeqCst) > 0
    }

    /// The user moved to a new image: prefetch its neighbours.
    ///
    /// Cancels any around-current run still in flight.
    pub fn notify_current_changed(
        self: &Arc<Self>,
        list: Arc<dyn ImageList>,
        current: usize,
    ) {
        let indices = around_candidates(
            current,
            list.len(),
            self.config.forward_count,
            self.config.backward_count,
        );
        let token = Self::replace_token(&self.around_token);
        self.start_run("photo-prefetch-around", token, list, indices);
    }

    /// Thumbnail scrolling settled on a visible range: prefetch it from
    /// the center outward.
    ///
    /// Cancels any visible-range run still in flight.
    pub fn notify_visible_range_settled(
        self: &Arc<Self>,
        list: Arc<dyn ImageList>,
        first: usize,
        last: usize,
    ) {
        let need = self.config.forward_count + self.config.backward_count;
        let indices = visible_candidates(first, last, list.len(), need);
        let token = Self::replace_token(&self.visible_token);
        self.start_run("photo-prefetch-visible", token, list, indices);
    }

    /// Cancel both intents' runs, for shutdown or list replacement.
    pub fn cancel_all(&self) {
        self.around_token.lock().unwrap().cancel();
        self.visible_token.lock().unwrap().cancel();
    }

    /// Cancel the slot's current token and install a fresh one.
    fn replace_token(slot: &Mutex<CancellationToken>) -> CancellationToken {
        let mut slot = slot.lock().unwrap();
        slot.cancel();
        let token = CancellationToken::new();
        *slot = token.clone();
        token
    }

    fn start_run(
        self: &Arc<Self>,
        thread_name: &str,
        token: CancellationToken,
        list: Arc<dyn ImageList>,
        indices: Vec<usize>,
    ) {
        if indices.is_empty() {
            return;
        }
        self.active_runs.fetch_add(1, Ordering::SeqCst);
        let coordinator = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                coordinator.drain(&token, list.as_ref(), &indices);
                coordinator.active_runs.fetch_sub(1, Ordering::SeqCst);
            });
        if let Err(err) = spawned {
            self.active_runs.fetch_sub(1, Ordering::SeqCst);
            log::warn!("failed to spawn prefetch thread: {}", err);
        }
    }

    /// Wait for the global busy flag so only one queue drains at a time.
    ///
    /// The losing intent parks here until the winner finishes or the
    /// parked run's token is cancelled.
    fn acquire_drain_slot(&self, token: &CancellationToken) -> bool {
        loop {
            if token.is_cancelled() {
                return false;
            }
            if self
                .busy
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    /// Work through the candidate list in order.
    ///
    /// Every candidate re-waits for the viewer to go idle, so a
    /// foreground load starting mid-queue parks the run until it
    /// finishes (bounded by the idle ceiling). Already-cached files are
    /// skipped without throttling. A file that fails to load is logged
    /// and skipped; the run keeps going. The token is checked before
    /// every file.
    fn drain(&self, token: &CancellationToken, list: &dyn ImageList, indices: &[usize]) {
        if !self.acquire_drain_slot(token) {
            log::debug!("prefetch run cancelled while waiting for the drain slot");
            return;
        }

        for &index in indices {
            if token.is_cancelled() {
                log::debug!("prefetch run cancelled at index {}", index);
                break;
            }
            if !self
                .activity
                .wait_until_idle(token, self.config.poll_interval, self.config.idle_ceiling)
            {
                log::debug!("prefetch run cancelled while waiting for idle viewer");
                break;
            }
            let Some(file) = list.file_at(index) else {
                continue;
            };
            if self.cache.is_in_cache(file.path()) {
                continue;
            }
            if self.cache.prefetch_one(file.as_ref()) {
                log::debug!("prefetched '{}'", file.name());
            } else {
                log::debug!("prefetch declined for '{}'", file.name());
            }
            thread::sleep(self.config.throttle);
        }

        self.busy.store(false, Ordering::Release);
    }
}
