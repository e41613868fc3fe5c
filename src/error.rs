//! Error types.
//!
//! Store and loader errors are returned from synchronous calls; playback
//! errors travel inside [`PlaybackEvent`](crate::playback::PlaybackEvent)s and
//! are therefore `Clone`.  Redundant calls such as pausing while nothing plays
//! are not errors at all: they return without effect.

use thiserror::Error;

use crate::item::ItemId;

/// A [`FeedStore`](crate::store::FeedStore) operation failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Another thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,

    /// An id-keyed operation was given an item that was never inserted.
    #[error("item has no store id")]
    Unassigned,

    /// Any other I/O or query failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// A page fetch did not produce a result.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking fetch task panicked or was cancelled.
    #[error("fetch task failed: {0}")]
    Task(String),
}

/// A synchronous loader mutation was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("index {index} out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    /// The store accepted the call but touched no rows.
    #[error("store did not update item {0}")]
    UpdateRejected(ItemId),

    /// The replacement carries a different id than the item in its slot.
    #[error("item at index {index} is {expected}, not {found}")]
    IdMismatch {
        index: usize,
        expected: ItemId,
        found: ItemId,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a playback session ended abnormally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// The surface never reported "prepared" within the timeout.
    #[error("prepare timeout")]
    PrepareTimeout,

    /// The surface reported a failure.
    #[error("playback error, code {0}")]
    Surface(i32),

    #[error("item {0} is not a video")]
    NotVideo(ItemId),

    #[error("item {0} has an empty video url")]
    MissingUrl(ItemId),
}
