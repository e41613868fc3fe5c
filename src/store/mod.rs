//! Feed store abstraction layer.
//!
//! This module defines the [`FeedStore`] trait, the persistence boundary of
//! the engine.  The only implementation shipped here is the in-process
//! [`MemoryStore`]; real hosts back the trait with whatever database they
//! already have.
//!
//! ## For contributors - adding a new store
//!
//! 1. Create a new file in this directory (e.g. `sqlite.rs`).
//! 2. Define a struct and implement [`FeedStore`] for it.  Every listing must
//!    be ordered by `created_at` descending, and `page` must be a window of
//!    exactly that ordering.
//! 3. Add `mod sqlite;` below and re-export your struct.
//!
//! The loader and the playback coordinator only ever see
//! `Arc<dyn FeedStore>`, so nothing else needs to change.

mod memory;

pub use memory::{sample_items, MemoryStore};

use crate::error::StoreError;
use crate::item::{FeedItem, ItemId, MediaKind};

/// Persistent storage for feed items.
///
/// Page fetches run on a blocking worker thread, so implementations must be
/// [`Send`] + [`Sync`].  Methods that report a row count return `Ok(0)` when
/// the id does not exist; that is not an error.
///
/// ## Implementing a new store
///
/// ```ignore
/// pub struct MyStore { /* connection pool */ }
///
/// impl FeedStore for MyStore {
///     fn insert(&self, item: &FeedItem) -> Result<ItemId, StoreError> { todo!() }
///     // ...
/// }
/// ```
pub trait FeedStore: Send + Sync {
    /// Persist a new item and return its freshly assigned id.  The store also
    /// stamps the creation time, which is strictly increasing across inserts.
    fn insert(&self, item: &FeedItem) -> Result<ItemId, StoreError>;

    fn delete(&self, id: ItemId) -> Result<usize, StoreError>;

    /// Update only the resume position of a video item.
    fn update_position(&self, id: ItemId, position_ms: u64) -> Result<usize, StoreError>;

    /// Replace every stored field of `item` (matched by id).
    fn update(&self, item: &FeedItem) -> Result<usize, StoreError>;

    /// Items `page_index * page_size ..` of the full listing, at most
    /// `page_size` of them.
    fn page(&self, page_index: usize, page_size: usize) -> Result<Vec<FeedItem>, StoreError>;

    /// The full listing, newest first.
    fn all(&self) -> Result<Vec<FeedItem>, StoreError>;

    fn get(&self, id: ItemId) -> Result<Option<FeedItem>, StoreError>;

    /// Delete every item and return how many were removed.
    fn clear(&self) -> Result<usize, StoreError>;

    /// Atomically swap the whole contents for `items`.  Either every item is
    /// stored or the previous contents are kept.
    fn replace_all(&self, items: &[FeedItem]) -> Result<(), StoreError>;

    fn favorites(&self) -> Result<Vec<FeedItem>, StoreError> {
        Ok(self.all()?.into_iter().filter(|item| item.favorite).collect())
    }

    fn by_media_kind(&self, kind: MediaKind) -> Result<Vec<FeedItem>, StoreError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|item| item.kind() == kind)
            .collect())
    }
}
