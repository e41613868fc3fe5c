//! feed-session - the stateful core of an infinite-scroll media feed.
//!
//! ## Architecture overview
//!
//! ```text
//!                 PageFetched                 ExposureEvent
//! ┌──────────┐   (channel)   ┌───────────┐  ┌─────────────┐
//! │ store/   │ ────────────► │ loader.rs │  │ exposure.rs │ ◄── ViewportProvider
//! │ (trait)  │               └─────┬─────┘  └──────┬──────┘
//! └──────────┘                     │               │
//!       ▲                          ▼               ▼
//!       │ update_position    ┌──────────────────────────┐   SessionEvent
//!       └──────────────────  │        session.rs        │ ─────────────► host
//!                            │     (owner context)      │
//!                            └────────────┬─────────────┘
//!                                         ▼
//!                            ┌──────────────────────────┐  PlaybackSignal
//!                            │       playback.rs        │ ◄──────────── MediaSurface
//!                            └──────────────────────────┘  (channel)
//! ```
//!
//! * **`store/`**: the [`FeedStore`] trait and the in-process [`MemoryStore`].
//! * **`loader`**: [`FeedLoader`], single-flight pagination over the store.
//! * **`exposure`**: [`ExposureTracker`], per-item visibility stages.
//! * **`playback`**: [`PlaybackCoordinator`], at most one video at a time.
//! * **`session`**: [`FeedSession`], owns the three and routes their events.
//! * **`viewport`**, **`sim`**: ready-made viewport and media surface for
//!   hosts without a real UI toolkit.
//! * **`config`**, **`error`**, **`item`**: shared plumbing.
//!
//! Everything except the store runs on one owner context.  Background work
//! reports back over channels and is folded in by [`FeedSession::pump`] or
//! [`FeedSession::next_wake`].

pub mod config;
pub mod error;
pub mod exposure;
pub mod item;
pub mod loader;
pub mod playback;
pub mod session;
pub mod sim;
pub mod store;
pub mod surface;
pub mod viewport;

#[cfg(test)]
mod testing;

pub use config::EngineConfig;
pub use error::{FeedError, LoadError, PlaybackError, StoreError};
pub use exposure::{ExposureEvent, ExposureStage, ExposureTracker, Rect, ViewportProvider};
pub use item::{FeedItem, ItemId, LayoutMode, Media, MediaKind};
pub use loader::{FeedLoader, LoaderEvent, PageCursor};
pub use playback::{PlaybackCoordinator, PlaybackEvent, PlaybackState};
pub use session::{FeedSession, SessionEvent};
pub use store::{FeedStore, MemoryStore};
pub use surface::{MediaSurface, SurfaceSignals};
pub use viewport::ListViewport;
