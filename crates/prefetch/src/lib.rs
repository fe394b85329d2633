//! Speculative prefetching for the photo viewer.
//!
//! Listens for navigation events and loads likely-next images into the
//! cache before the user asks for them. Two intents are tracked
//! independently: the neighbours of the current image, and the settled
//! visible thumbnail range. Each new event cancels the still-running
//! prefetch for the same intent, and all prefetch work defers to
//! foreground loads via [`LoadActivity`].

mod activity;
mod cancel;
mod candidates;
mod coordinator;

pub use activity::{ActivityGuard, LoadActivity};
pub use cancel::CancellationToken;
pub use candidates::{around_candidates, visible_candidates};
pub use coordinator::{ImageList, PrefetchConfig, PrefetchCoordinator};
