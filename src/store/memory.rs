//! In-process feed store.
//!
//! [`MemoryStore`] keeps every item in a `Vec` sorted newest first behind a
//! mutex.  It is the reference implementation of [`FeedStore`]: the host
//! binary runs on it and the test suites use it as ground truth.  Use it as a
//! template when backing the trait with a real database.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use super::FeedStore;
use crate::error::StoreError;
use crate::item::{FeedItem, ItemId, LayoutMode};

/// A thread-safe, non-persistent [`FeedStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Sorted by `FeedItem`'s `Ord` (newest first).
    rows: Vec<FeedItem>,
    last_id: i64,
    last_stamp: Option<DateTime<Utc>>,
}

impl Inner {
    fn next_id(&mut self) -> ItemId {
        self.last_id += 1;
        ItemId(self.last_id)
    }

    /// Wall-clock now, nudged forward so that stamps never repeat.
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn push_newest(&mut self, item: &FeedItem) -> ItemId {
        let mut row = item.clone();
        row.id = self.next_id();
        row.created_at = self.next_stamp();
        let id = row.id;
        // Fresh stamps are always the newest.
        self.rows.insert(0, row);
        id
    }

    fn find_mut(&mut self, id: ItemId) -> Option<&mut FeedItem> {
        self.rows.iter_mut().find(|row| row.id == id)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with one item of every single/grid × image/video
    /// combination, inserted in that order (so the grid video is newest).
    pub fn with_sample_data() -> Self {
        let mut inner = Inner::default();
        for item in sample_items() {
            inner.push_newest(&item);
        }
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// The four demo posts a fresh install starts with.
pub fn sample_items() -> Vec<FeedItem> {
    vec![
        FeedItem::image(
            "Single image",
            "A full-width image post",
            "https://example.com/image1.jpg",
            800,
            600,
            LayoutMode::Single,
        ),
        FeedItem::video(
            "Single video",
            "A full-width video post",
            "https://example.com/clip-short.mp4",
            "https://example.com/clip-cover.jpg",
            1920,
            1080,
            120_000,
            LayoutMode::Single,
        ),
        FeedItem::image(
            "Grid image",
            "An image in the two-column grid",
            "https://example.com/image2.jpg",
            400,
            300,
            LayoutMode::Grid,
        ),
        FeedItem::video(
            "Grid video",
            "A video in the two-column grid",
            "https://example.com/clip-short.mp4",
            "https://example.com/clip-cover.jpg",
            1280,
            720,
            90_000,
            LayoutMode::Grid,
        ),
    ]
}

impl FeedStore for MemoryStore {
    fn insert(&self, item: &FeedItem) -> Result<ItemId, StoreError> {
        Ok(self.lock()?.push_newest(item))
    }

    fn delete(&self, id: ItemId) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let before = inner.rows.len();
        inner.rows.retain(|row| row.id != id);
        Ok(before - inner.rows.len())
    }

    fn update_position(&self, id: ItemId, position_ms: u64) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        match inner.find_mut(id) {
            Some(row) => Ok(usize::from(row.set_last_position_ms(position_ms))),
            None => Ok(0),
        }
    }

    fn update(&self, item: &FeedItem) -> Result<usize, StoreError> {
        if !item.id.is_assigned() {
            return Err(StoreError::Unassigned);
        }
        let mut inner = self.lock()?;
        let Some(row) = inner.find_mut(item.id) else {
            return Ok(0);
        };
        // The creation stamp is the sort key and belongs to the store.
        let created_at = row.created_at;
        *row = item.clone();
        row.created_at = created_at;
        Ok(1)
    }

    fn page(&self, page_index: usize, page_size: usize) -> Result<Vec<FeedItem>, StoreError> {
        let inner = self.lock()?;
        let offset = page_index.saturating_mul(page_size);
        Ok(inner
            .rows
            .iter()
            .skip(offset)
            .take(page_size)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<FeedItem>, StoreError> {
        Ok(self.lock()?.rows.clone())
    }

    fn get(&self, id: ItemId) -> Result<Option<FeedItem>, StoreError> {
        Ok(self.lock()?.rows.iter().find(|row| row.id == id).cloned())
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let count = inner.rows.len();
        inner.rows.clear();
        Ok(count)
    }

    fn replace_all(&self, items: &[FeedItem]) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let mut row = item.clone();
            row.id = inner.next_id();
            rows.push(row);
        }
        rows.sort();
        if let Some(newest) = rows.first() {
            let newest = newest.created_at;
            inner.last_stamp = Some(inner.last_stamp.map_or(newest, |last| last.max(newest)));
        }
        inner.rows = rows;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::MediaKind;

    fn titled(title: &str) -> FeedItem {
        FeedItem::image(title, "", "https://example.com/x.jpg", 1, 1, LayoutMode::Single)
    }

    #[test]
    fn insert_assigns_increasing_ids_and_lists_newest_first() {
        let store = MemoryStore::new();
        let a = store.insert(&titled("a")).unwrap();
        let b = store.insert(&titled("b")).unwrap();
        assert!(b > a);

        let all = store.all().unwrap();
        assert_eq!(all[0].title, "b", "newest first");
        assert_eq!(all[1].title, "a");
        assert!(all[0].created_at > all[1].created_at, "stamps strictly increase");
    }

    #[test]
    fn page_is_a_window_of_the_full_listing() {
        let store = MemoryStore::new();
        for i in 0..12 {
            store.insert(&titled(&format!("item {i}"))).unwrap();
        }
        let all = store.all().unwrap();

        let first = store.page(0, 5).unwrap();
        let third = store.page(2, 5).unwrap();
        let beyond = store.page(3, 5).unwrap();

        assert_eq!(first, all[0..5]);
        assert_eq!(third, all[10..12]);
        assert!(beyond.is_empty());
    }

    #[test]
    fn delete_and_update_report_row_counts() {
        let store = MemoryStore::new();
        let id = store.insert(&titled("a")).unwrap();

        let mut edited = store.get(id).unwrap().unwrap();
        edited.favorite = true;
        assert_eq!(store.update(&edited).unwrap(), 1);
        assert!(store.get(id).unwrap().unwrap().favorite);

        assert_eq!(store.delete(id).unwrap(), 1);
        assert_eq!(store.delete(id).unwrap(), 0, "already gone");
        assert_eq!(store.update(&edited).unwrap(), 0);
    }

    #[test]
    fn update_keeps_the_store_owned_creation_stamp() {
        let store = MemoryStore::new();
        let id = store.insert(&titled("a")).unwrap();
        let stamped = store.get(id).unwrap().unwrap();

        let mut edited = stamped.clone();
        edited.created_at = chrono::Utc::now() + Duration::days(365);
        store.update(&edited).unwrap();

        assert_eq!(store.get(id).unwrap().unwrap().created_at, stamped.created_at);
    }

    #[test]
    fn update_rejects_items_without_an_id() {
        let store = MemoryStore::new();
        assert_eq!(store.update(&titled("loose")), Err(StoreError::Unassigned));
    }

    #[test]
    fn position_update_only_touches_videos() {
        let store = MemoryStore::with_sample_data();
        let videos = store.by_media_kind(MediaKind::Video).unwrap();
        let images = store.by_media_kind(MediaKind::Image).unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(images.len(), 2);

        assert_eq!(store.update_position(videos[0].id, 30_000).unwrap(), 1);
        assert_eq!(store.get(videos[0].id).unwrap().unwrap().last_position_ms(), 30_000);
        assert_eq!(store.update_position(images[0].id, 30_000).unwrap(), 0);
    }

    #[test]
    fn sample_data_is_seeded_like_ordinary_inserts() {
        let store = MemoryStore::with_sample_data();
        let all = store.all().unwrap();
        let ids: Vec<_> = all.iter().map(|i| i.id).collect();
        assert_eq!(ids, [ItemId(4), ItemId(3), ItemId(2), ItemId(1)]);
        assert_eq!(all[0].title, sample_items()[3].title, "last sample is newest");

        let next = store.insert(&titled("next")).unwrap();
        assert_eq!(next, ItemId(5), "ids continue after the seed");
    }

    #[test]
    fn favorites_filters_and_keeps_order() {
        let store = MemoryStore::new();
        for title in ["a", "b", "c"] {
            let mut item = titled(title);
            item.favorite = title != "b";
            store.insert(&item).unwrap();
        }
        let titles: Vec<_> = store.favorites().unwrap().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, ["c", "a"]);
    }

    #[test]
    fn clear_and_replace_all() {
        let store = MemoryStore::with_sample_data();
        assert_eq!(store.clear().unwrap(), 4);
        assert!(store.is_empty());

        store.replace_all(&sample_items()).unwrap();
        assert_eq!(store.len(), 4);

        let later = store.insert(&titled("later")).unwrap();
        assert_eq!(store.all().unwrap()[0].id, later, "inserts stay newest after a replace");
    }
}
