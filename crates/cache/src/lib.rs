//! Bounded-memory cache for decoded photos.
//!
//! The cache holds full decoded bitmaps under two independent ceilings,
//! an entry count and a byte total, and evicts in strict least-recently-
//! used order when either is exceeded. Admission control runs before a
//! decode is attempted so the process never overshoots its budget by
//! more than one image, and speculative prefetch work passes through a
//! reservation system that counts in-flight decodes against the budget.
//!
//! # Architecture
//!
//! - [`ImageCache`] is the public entry point: lookup, load, preload,
//!   explicit eviction, runtime reconfiguration.
//! - `EntryStore` (internal) is the concurrent key→bitmap table with
//!   logical-clock access stamps.
//! - `CapacityManager` (internal) serializes batch eviction, tracks
//!   prefetch reservations, and runs the post-insert cleanup pass.
//! - [`estimate_size`] predicts a decode's memory cost from metadata
//!   before any pixels exist.
//! - Bitmap teardown is pluggable via [`DisposalExecutor`], so callers
//!   with thread-affine image resources can route frees to their own
//!   thread with [`ChannelDisposer`].

mod cache;
mod capacity;
mod config;
mod disposal;
mod estimator;
mod events;
mod store;

pub use cache::ImageCache;
pub use capacity::Reservation;
pub use config::{CacheConfig, ConfigError};
pub use disposal::{ChannelDisposer, DisposalExecutor, DropDisposer, PendingDisposals};
pub use estimator::estimate_size;
pub use events::{CacheEvents, StatusListener};
pub use store::CacheStats;
