//! Paginated feed loading.
//!
//! [`FeedLoader`] owns the in-memory item list and grows it one page at a
//! time.  The store query runs on tokio's blocking pool; its result is sent
//! back over an [`mpsc`] channel and only applied when the owner context
//! calls [`FeedLoader::apply_page`] (usually via
//! [`FeedSession`](crate::session::FeedSession)).  All list mutation and
//! every listener callback therefore happen on the owner context.
//!
//! ## Single flight
//!
//! While a fetch is outstanding, [`FeedLoader::load_next_page`] does nothing.
//! [`FeedLoader::refresh`] bumps a generation counter, so a fetch that was
//! still in flight when the refresh happened is dropped on arrival instead of
//! being appended to the new list.
//!
//! Every public method is owner-context only and must be called from within
//! a tokio runtime.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{FeedError, LoadError};
use crate::item::{FeedItem, ItemId, MediaKind};
use crate::store::FeedStore;

/// Notifications for list UIs.
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderEvent {
    /// A page fetch was issued.
    Started,
    RangeInserted { start: usize, count: usize },
    RangeRemoved { start: usize, count: usize },
    RangeChanged { start: usize, count: usize },
    /// The whole list was replaced; indices from before are meaningless.
    Reset,
    /// A page fetch finished.  Carries the items of that page only.
    Complete(Vec<FeedItem>),
    /// A page fetch failed.  `has_more` is unchanged, so a retry is possible.
    Error(String),
}

/// Pagination bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Next page to fetch.
    pub page_index: usize,
    pub page_size: usize,
    pub is_loading: bool,
    pub has_more: bool,
}

impl PageCursor {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_index: 0,
            page_size,
            is_loading: false,
            has_more: true,
        }
    }
}

/// The result of one background page query, on its way to the owner context.
#[derive(Debug)]
pub struct PageFetched {
    generation: u64,
    page_index: usize,
    result: Result<Vec<FeedItem>, LoadError>,
}

type Listener = Box<dyn FnMut(&LoaderEvent)>;

pub struct FeedLoader {
    store: Arc<dyn FeedStore>,
    items: Vec<FeedItem>,
    cursor: PageCursor,
    generation: u64,
    tx: mpsc::UnboundedSender<PageFetched>,
    rx: mpsc::UnboundedReceiver<PageFetched>,
    listener: Option<Listener>,
}

impl FeedLoader {
    /// `page_size` must be at least 1.
    pub fn new(store: Arc<dyn FeedStore>, page_size: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            items: Vec::new(),
            cursor: PageCursor::new(page_size.max(1)),
            generation: 0,
            tx,
            rx,
            listener: None,
        }
    }

    pub fn set_listener(&mut self, listener: impl FnMut(&LoaderEvent) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    fn emit(&mut self, event: LoaderEvent) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&event);
        }
    }

    // -- accessors -----------------------------------------------------------

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_at(&self, index: usize) -> Option<&FeedItem> {
        self.items.get(index)
    }

    pub fn position_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn is_loading(&self) -> bool {
        self.cursor.is_loading
    }

    pub fn has_more(&self) -> bool {
        self.cursor.has_more
    }

    /// Whether a host should offer a "load more" affordance after binding
    /// the row at `bound_index`: the row is one of the last two, more pages
    /// exist, and nothing is loading.
    pub fn should_show_load_more(&self, bound_index: usize) -> bool {
        bound_index + 2 >= self.items.len() && self.cursor.has_more && !self.cursor.is_loading
    }

    /// First video at or after `from`, stopping after `until` (inclusive).
    pub fn find_video(&self, from: usize, until: usize) -> Option<usize> {
        let last = until.min(self.items.len().checked_sub(1)?);
        (from..=last).find(|&index| self.items[index].kind() == MediaKind::Video)
    }

    // -- pagination ----------------------------------------------------------

    /// Issue a fetch for the next page.  Returns `false` (and does nothing)
    /// while a fetch is outstanding or after the last page was seen.
    pub fn load_next_page(&mut self) -> bool {
        if self.cursor.is_loading || !self.cursor.has_more {
            trace!(
                is_loading = self.cursor.is_loading,
                has_more = self.cursor.has_more,
                "load_next_page ignored"
            );
            return false;
        }

        self.cursor.is_loading = true;
        self.emit(LoaderEvent::Started);

        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let generation = self.generation;
        let page_index = self.cursor.page_index;
        let page_size = self.cursor.page_size;
        debug!(page_index, page_size, "fetching page");

        tokio::spawn(async move {
            let fetch = tokio::task::spawn_blocking(move || store.page(page_index, page_size));
            let result = match fetch.await {
                Ok(page) => page.map_err(LoadError::from),
                Err(join) => Err(LoadError::Task(join.to_string())),
            };
            // The loader owns the receiver; if it is gone nobody cares.
            let _ = tx.send(PageFetched {
                generation,
                page_index,
                result,
            });
        });
        true
    }

    /// Wait for the next fetched page.  Cancel-safe.
    pub async fn recv_page(&mut self) -> Option<PageFetched> {
        self.rx.recv().await
    }

    /// Apply every page that has already arrived.  Returns how many were
    /// applied (stale ones excluded).
    pub fn drain_pages(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(page) = self.rx.try_recv() {
            if self.apply_page(page) {
                applied += 1;
            }
        }
        applied
    }

    /// Fold a fetch result into the list.  Returns `false` if the result
    /// belonged to a fetch from before the last refresh.
    pub fn apply_page(&mut self, page: PageFetched) -> bool {
        if page.generation != self.generation {
            debug!(
                page_index = page.page_index,
                "dropping page fetched before refresh"
            );
            return false;
        }

        match page.result {
            Ok(new_items) => {
                if new_items.len() < self.cursor.page_size {
                    self.cursor.has_more = false;
                }
                let start = self.items.len();
                let count = new_items.len();
                self.items.extend(new_items.iter().cloned());
                if count > 0 {
                    self.emit(LoaderEvent::RangeInserted { start, count });
                }
                self.cursor.page_index += 1;
                self.cursor.is_loading = false;
                debug!(
                    page_index = page.page_index,
                    count,
                    has_more = self.cursor.has_more,
                    "page loaded"
                );
                self.emit(LoaderEvent::Complete(new_items));
            }
            Err(err) => {
                self.cursor.is_loading = false;
                warn!(page_index = page.page_index, error = %err, "page fetch failed");
                self.emit(LoaderEvent::Error(err.to_string()));
            }
        }
        true
    }

    /// Drop the list and start over from the first page.
    pub fn refresh(&mut self) {
        self.generation += 1;
        self.cursor = PageCursor::new(self.cursor.page_size);
        self.items.clear();
        self.emit(LoaderEvent::Reset);
        self.load_next_page();
    }

    // -- single-item mutation ------------------------------------------------

    /// Persist `item` and put it at the top of the list.
    pub fn add_item(&mut self, mut item: FeedItem) -> Result<ItemId, FeedError> {
        let id = self.store.insert(&item)?;
        // Re-read so the list carries the store's creation stamp.
        item = match self.store.get(id)? {
            Some(stored) => stored,
            None => {
                item.id = id;
                item
            }
        };
        self.items.insert(0, item);
        self.emit(LoaderEvent::RangeInserted { start: 0, count: 1 });
        Ok(id)
    }

    pub fn remove_item(&mut self, index: usize) -> Result<FeedItem, FeedError> {
        let id = self.checked(index)?.id;
        let removed = self.store.delete(id)?;
        if removed == 0 {
            warn!(%id, "store had no row for removed item");
        }
        let item = self.items.remove(index);
        self.emit(LoaderEvent::RangeRemoved {
            start: index,
            count: 1,
        });
        Ok(item)
    }

    /// Write `new_item` through to the store.  The list slot changes only if
    /// `new_item` keeps the slot's id and the store reports a row was
    /// updated.
    pub fn update_item(&mut self, index: usize, new_item: FeedItem) -> Result<(), FeedError> {
        let expected = self.checked(index)?.id;
        if new_item.id != expected {
            warn!(index, %expected, found = %new_item.id, "update_item id mismatch");
            return Err(FeedError::IdMismatch {
                index,
                expected,
                found: new_item.id,
            });
        }
        let rows = self.store.update(&new_item).map_err(|err| {
            warn!(index, error = %err, "update_item failed");
            err
        })?;
        if rows == 0 {
            warn!(index, id = %new_item.id, "update_item rejected by store");
            return Err(FeedError::UpdateRejected(new_item.id));
        }
        self.items[index] = new_item;
        self.emit(LoaderEvent::RangeChanged {
            start: index,
            count: 1,
        });
        Ok(())
    }

    pub fn toggle_favorite(&mut self, index: usize) -> Result<bool, FeedError> {
        let mut item = self.checked(index)?.clone();
        item.favorite = !item.favorite;
        let favorite = item.favorite;
        self.update_item(index, item)?;
        Ok(favorite)
    }

    /// Swap between single and grid layout (staggered stays staggered).
    pub fn toggle_layout(&mut self, index: usize) -> Result<(), FeedError> {
        let mut item = self.checked(index)?.clone();
        item.layout = item.layout.toggled();
        self.update_item(index, item)
    }

    /// Delete everything from the store and empty the list.
    pub fn clear_all(&mut self) -> Result<usize, FeedError> {
        let count = self.store.clear()?;
        self.generation += 1;
        self.items.clear();
        self.cursor = PageCursor::new(self.cursor.page_size);
        self.cursor.has_more = false;
        self.emit(LoaderEvent::Reset);
        Ok(count)
    }

    /// Mirror a watch position that was already persisted elsewhere.  No
    /// store write, no event.
    pub fn record_position(&mut self, id: ItemId, position_ms: u64) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            item.set_last_position_ms(position_ms);
        }
    }

    fn checked(&self, index: usize) -> Result<&FeedItem, FeedError> {
        self.items.get(index).ok_or(FeedError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }
}

impl std::fmt::Debug for FeedLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedLoader")
            .field("items", &self.items.len())
            .field("cursor", &self.cursor)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
