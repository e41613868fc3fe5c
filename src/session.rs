//! The owner context.
//!
//! [`FeedSession`] composes the [`FeedLoader`], the [`ExposureTracker`] and
//! the [`PlaybackCoordinator`] and is the only thing that touches them.
//! Hosts call it from their UI loop, the same way the terminal host calls
//! it once per tick.
//!
//! Events from all three components are queued in arrival order and handed
//! out by [`FeedSession::drain_events`].  Background work (page fetches,
//! surface callbacks, the prepare timeout) is folded in either by awaiting
//! [`FeedSession::next_wake`] or by calling [`FeedSession::pump`] on a tick.
//!
//! ## Cross-component rules
//!
//! * Applying a page, adding, editing, or removing an item re-runs exposure
//!   as a data-set change.
//! * Removing an item forgets its exposure stage and stops its playback if
//!   it was the active one.
//! * Refresh and clear stop playback, since the bound row disappears.
//! * A position persisted by the coordinator is mirrored into the loaded
//!   list so later setups and renders see it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::FeedError;
use crate::exposure::{ExposureEvent, ExposureTracker, ViewportProvider};
use crate::item::{FeedItem, ItemId};
use crate::loader::{FeedLoader, LoaderEvent, PageFetched};
use crate::playback::{PlaybackCoordinator, PlaybackEvent};
use crate::store::FeedStore;
use crate::surface::{MediaSurface, PlaybackSignal};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Loader(LoaderEvent),
    Exposure(ExposureEvent),
    Playback(PlaybackEvent),
}

type EventQueue = Rc<RefCell<VecDeque<SessionEvent>>>;
type PositionQueue = Rc<RefCell<Vec<(ItemId, u64)>>>;

enum Wake {
    Page(Option<PageFetched>),
    Signal(Option<PlaybackSignal>),
}

pub struct FeedSession {
    loader: FeedLoader,
    tracker: ExposureTracker,
    playback: PlaybackCoordinator,
    events: EventQueue,
    positions: PositionQueue,
}

impl FeedSession {
    /// Build the three components on `store` and wire their listeners.
    /// Must be called inside a tokio runtime.
    pub fn new(store: Arc<dyn FeedStore>, config: &EngineConfig) -> Self {
        let events: EventQueue = Rc::default();
        let positions: PositionQueue = Rc::default();

        let mut loader = FeedLoader::new(Arc::clone(&store), config.page_size);
        let queue = events.clone();
        loader.set_listener(move |event| {
            queue
                .borrow_mut()
                .push_back(SessionEvent::Loader(event.clone()))
        });

        let mut tracker = ExposureTracker::new(config.exposure_debounce());
        let queue = events.clone();
        tracker.set_observer(move |event| {
            queue
                .borrow_mut()
                .push_back(SessionEvent::Exposure(*event))
        });

        let mut playback = PlaybackCoordinator::new(store, config.prepare_timeout());
        let queue = events.clone();
        let saved = positions.clone();
        playback.set_listener(move |event| {
            if let Some(position) = resume_point(event) {
                saved.borrow_mut().push(position);
            }
            queue.borrow_mut().push_back(SessionEvent::Playback(event.clone()));
        });

        Self {
            loader,
            tracker,
            playback,
            events,
            positions,
        }
    }

    // -- accessors -----------------------------------------------------------

    pub fn loader(&self) -> &FeedLoader {
        &self.loader
    }

    pub fn tracker(&self) -> &ExposureTracker {
        &self.tracker
    }

    pub fn playback(&self) -> &PlaybackCoordinator {
        &self.playback
    }

    pub fn items(&self) -> &[FeedItem] {
        self.loader.items()
    }

    /// Every event queued since the last call, oldest first.
    pub fn drain_events(&self) -> Vec<SessionEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    // -- exposure ------------------------------------------------------------

    /// Start exposure tracking on `viewport`.  Returns the number of stage
    /// transitions of the initial pass.
    pub fn start(&mut self, viewport: Box<dyn ViewportProvider>) -> usize {
        self.tracker.start(viewport, self.loader.items())
    }

    pub fn on_scrolled(&mut self) -> Option<usize> {
        self.tracker.on_scrolled(self.loader.items())
    }

    pub fn on_scroll_idle(&mut self) -> usize {
        self.tracker.on_scroll_idle(self.loader.items())
    }

    /// Re-evaluate after the list or its layout changed.  The session calls
    /// this itself for its own edits; hosts call it when row geometry moves.
    pub fn on_data_set_changed(&mut self) -> usize {
        self.tracker.on_data_set_changed(self.loader.items())
    }

    // -- loading and editing -------------------------------------------------

    pub fn load_next_page(&mut self) -> bool {
        self.loader.load_next_page()
    }

    pub fn refresh(&mut self) {
        self.stop_playback();
        self.loader.refresh();
    }

    pub fn add_item(&mut self, item: FeedItem) -> Result<ItemId, FeedError> {
        let id = self.loader.add_item(item)?;
        self.on_data_set_changed();
        Ok(id)
    }

    pub fn remove_item(&mut self, index: usize) -> Result<FeedItem, FeedError> {
        let id = self
            .loader
            .item_at(index)
            .map(|item| item.id)
            .ok_or(FeedError::IndexOutOfRange {
                index,
                len: self.loader.len(),
            })?;
        if self.playback.active_item().is_some_and(|active| active.id == id) {
            debug!(item = %id, "removing the active item; stopping playback");
            self.stop_playback();
        }

        let removed = self.loader.remove_item(index)?;
        self.tracker.forget(removed.id);
        self.on_data_set_changed();
        Ok(removed)
    }

    pub fn update_item(&mut self, index: usize, item: FeedItem) -> Result<(), FeedError> {
        self.loader.update_item(index, item)?;
        self.on_data_set_changed();
        Ok(())
    }

    pub fn toggle_favorite(&mut self, index: usize) -> Result<bool, FeedError> {
        let favorite = self.loader.toggle_favorite(index)?;
        self.on_data_set_changed();
        Ok(favorite)
    }

    pub fn toggle_layout(&mut self, index: usize) -> Result<(), FeedError> {
        self.loader.toggle_layout(index)?;
        self.on_data_set_changed();
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<usize, FeedError> {
        self.stop_playback();
        self.loader.clear_all()
    }

    // -- playback ------------------------------------------------------------

    /// Set up playback of the item at `index`.  `Ok(false)` means the
    /// coordinator rejected it (see its error event).
    pub fn play_item(
        &mut self,
        index: usize,
        surface: Box<dyn MediaSurface>,
    ) -> Result<bool, FeedError> {
        let item = self.checked(index)?.clone();
        let started = self.playback.setup_playback(&item, surface);
        self.sync_positions();
        Ok(started)
    }

    /// Click behaviour for the item at `index`.
    pub fn toggle_item(
        &mut self,
        index: usize,
        surface: impl FnOnce() -> Box<dyn MediaSurface>,
    ) -> Result<bool, FeedError> {
        let item = self.checked(index)?.clone();
        let changed = self.playback.toggle(&item, surface);
        self.sync_positions();
        Ok(changed)
    }

    pub fn pause_playback(&mut self) -> bool {
        let paused = self.playback.pause_playback();
        self.sync_positions();
        paused
    }

    pub fn stop_playback(&mut self) -> bool {
        let stopped = self.playback.stop_playback();
        self.sync_positions();
        stopped
    }

    /// The first video at or after `from` inside the visible range.  Used to
    /// auto-play after a page load and to move on after a completion.
    pub fn autoplay_candidate(&self, from: usize) -> Option<usize> {
        let (first, last) = self.tracker.visible_range()?;
        let start = from.max(first);
        if start > last {
            return None;
        }
        self.loader.find_video(start, last)
    }

    // -- wakeups -------------------------------------------------------------

    /// Wait for the next background result and fold it in.  Waits forever
    /// if nothing is outstanding, so hosts usually race it against input.
    pub async fn next_wake(&mut self) {
        let wake = tokio::select! {
            page = self.loader.recv_page() => Wake::Page(page),
            signal = self.playback.recv_signal() => Wake::Signal(signal),
        };
        match wake {
            Wake::Page(Some(page)) => {
                if self.loader.apply_page(page) {
                    self.on_data_set_changed();
                }
            }
            Wake::Signal(Some(signal)) => {
                self.playback.dispatch(signal);
                self.sync_positions();
            }
            Wake::Page(None) | Wake::Signal(None) => {}
        }
    }

    /// Fold in everything that already arrived without waiting.  Returns the
    /// number of pages and signals handled.
    pub fn pump(&mut self) -> usize {
        let pages = self.loader.drain_pages();
        if pages > 0 {
            self.on_data_set_changed();
        }
        let signals = self.playback.drain_signals();
        self.sync_positions();
        pages + signals
    }

    /// Stop playback, stop tracking, and detach every listener.
    pub fn shutdown(&mut self) {
        self.playback.release();
        self.sync_positions();
        self.tracker.stop();
        self.loader.clear_listener();
        debug!("feed session shut down");
    }

    // -- internals -----------------------------------------------------------

    fn sync_positions(&mut self) {
        let saved = std::mem::take(&mut *self.positions.borrow_mut());
        for (id, position_ms) in saved {
            self.loader.record_position(id, position_ms);
        }
    }

    fn checked(&self, index: usize) -> Result<&FeedItem, FeedError> {
        self.loader.item_at(index).ok_or(FeedError::IndexOutOfRange {
            index,
            len: self.loader.len(),
        })
    }
}

/// The position a playback event leaves the item at, if it ends a session.
fn resume_point(event: &PlaybackEvent) -> Option<(ItemId, u64)> {
    match event {
        PlaybackEvent::Paused { item, position_ms } => Some((item.id, *position_ms)),
        PlaybackEvent::Stopped(item) | PlaybackEvent::Completed(item) => {
            Some((item.id, item.last_position_ms()))
        }
        _ => None,
    }
}

impl std::fmt::Debug for FeedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSession")
            .field("loader", &self.loader)
            .field("tracker", &self.tracker)
            .field("playback", &self.playback)
            .field("queued_events", &self.events.borrow().len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
