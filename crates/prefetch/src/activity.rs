//! Foreground load activity tracking
//!
//! Prefetch is background work and must not compete with a load the
//! user is actively waiting on. [`LoadActivity`] counts in-flight
//! foreground loads plus a thumbnail-generation busy flag; prefetch
//! runs poll it and hold off until the viewer goes idle.

use crate::cancel::CancellationToken;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

/// Shared record of what the viewer is busy with right now.
pub struct LoadActivity {
    foreground_loads: AtomicUsize,
    thumbnails_busy: AtomicBool,
}

impl LoadActivity {
    pub fn new() -> Self {
        Self {
            foreground_loads: AtomicUsize::new(0),
            thumbnails_busy: AtomicBool::new(false),
        }
    }

    /// Mark a foreground load as started.
    ///
    /// The returned guard marks it finished when dropped, on every exit
    /// path including panics.
    pub fn begin_load(self: &Arc<Self>) -> ActivityGuard {
        self.foreground_loads.fetch_add(1, Ordering::SeqCst);
        ActivityGuard {
            activity: Arc::clone(self),
        }
    }

    /// Flag thumbnail generation as running or finished.
    pub fn set_thumbnails_busy(&self, busy: bool) {
        self.thumbnails_busy.store(busy, Ordering::SeqCst);
    }

    /// Whether nothing the user is waiting on is in flight.
    pub fn is_idle(&self) -> bool {
        self.foreground_loads.load(Ordering::SeqCst) == 0
            && !self.thumbnails_busy.load(Ordering::SeqCst)
    }

    /// Block until the viewer is idle, the run is cancelled, or the
    /// ceiling elapses.
    ///
    /// Returns `false` only on cancellation. A busy viewer past the
    /// ceiling returns `true` so a stuck flag cannot starve prefetch
    /// forever.
    pub fn wait_until_idle(
        &self,
        token: &CancellationToken,
        poll_interval: Duration,
        ceiling: Duration,
    ) -> bool {
        let deadline = Instant::now() + ceiling;
        while !self.is_idle() {
            if token.is_cancelled() {
                return false;
            }
            if Instant::now() >= deadline {
                log::debug!("viewer still busy after {:?}, prefetching anyway", ceiling);
                break;
            }
            thread::sleep(poll_interval);
        }
        !token.is_cancelled()
    }
}

impl Default for LoadActivity {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII marker for one in-flight foreground load.
pub struct ActivityGuard {
    activity: Arc<LoadActivity>,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.activity.foreground_loads.fetch_sub(1, Ordering::SeqCst);
    }
}
