//! Deferred bitmap disposal.
//!
//! Display bitmaps may wrap graphics resources that are single-thread
//! affine, so the cache never frees an evicted bitmap on the thread that
//! ran the eviction scan. Evicted entries are handed to a
//! [`DisposalExecutor`]; the production implementation queues them on a
//! channel drained by the UI-owning thread, while tests and headless use
//! drop inline.

use photo_viewer_decode::Bitmap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};

/// Receives ownership of evicted bitmaps for teardown.
///
/// The executor gets the cache's ownership share of the bitmap; the
/// actual free happens when the last `Arc` clone drops.
pub trait DisposalExecutor: Send + Sync {
    /// Take responsibility for releasing the bitmap.
    fn dispose(&self, bitmap: Arc<Bitmap>);
}

/// Disposal executor that drops inline on the calling thread.
///
/// Suitable for plain memory bitmaps and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropDisposer;

impl DisposalExecutor for DropDisposer {
    fn dispose(&self, bitmap: Arc<Bitmap>) {
        drop(bitmap);
    }
}

/// Disposal executor that queues bitmaps for another thread to release.
///
/// # Example
///
/// ```
/// use photo_viewer_cache::{ChannelDisposer, DisposalExecutor};
/// use photo_viewer_decode::{Bitmap, PixelFormat};
/// use std::sync::Arc;
///
/// let (disposer, pending) = ChannelDisposer::new();
///
/// let bitmap = Arc::new(Bitmap::new(PixelFormat::Rgb8, 1, 1, vec![0, 0, 0]));
/// disposer.dispose(bitmap);
///
/// // On the UI-owning thread:
/// assert_eq!(pending.drain(), 1);
/// ```
pub struct ChannelDisposer {
    tx: Mutex<Sender<Arc<Bitmap>>>,
}

impl ChannelDisposer {
    /// Create a disposer and the queue the owning thread drains.
    pub fn new() -> (Self, PendingDisposals) {
        let (tx, rx) = mpsc::channel();
        (
            Self { tx: Mutex::new(tx) },
            PendingDisposals { rx },
        )
    }
}

impl DisposalExecutor for ChannelDisposer {
    fn dispose(&self, bitmap: Arc<Bitmap>) {
        // If the draining side is gone the bitmap drops here; that only
        // happens during shutdown when thread affinity no longer matters.
        if self.tx.lock().unwrap().send(bitmap).is_err() {
            log::debug!("disposal queue closed; releasing bitmap inline");
        }
    }
}

/// Receiving side of a [`ChannelDisposer`].
pub struct PendingDisposals {
    rx: Receiver<Arc<Bitmap>>,
}

impl PendingDisposals {
    /// Release everything currently queued. Returns the number of bitmaps
    /// released. Non-blocking; call from the owning thread's idle loop.
    pub fn drain(&self) -> usize {
        let mut released = 0;
        loop {
            match self.rx.try_recv() {
                Ok(bitmap) => {
                    drop(bitmap);
                    released += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        released
    }
}
