use std::time::Duration;

use feed_session::sim::SimulatedSurface;
use feed_session::store::sample_items;
use feed_session::{
    FeedItem, FeedSession, LayoutMode, ListViewport, LoaderEvent, MediaSurface, PlaybackEvent,
    PlaybackState, SessionEvent,
};

/// How long the simulated player takes to "buffer".
const PREPARE_DELAY: Duration = Duration::from_millis(400);

/// Terminal rows an item occupies, separator line included.
pub fn rows_for(item: &FeedItem) -> u16 {
    match item.layout {
        LayoutMode::Single => 5,
        LayoutMode::Grid | LayoutMode::Staggered => 4,
    }
}

pub struct App {
    pub session: FeedSession,
    /// Shared with the exposure tracker; the renderer draws exactly what it
    /// reports as visible.
    pub viewport: ListViewport,
    pub selected: Option<usize>,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last status message.
    pub status: String,
    /// Exposure transitions seen so far.
    pub exposures: usize,
    scrolled: bool,
    idle_pending: bool,
    added: usize,
    heights: Vec<u16>,
}

impl App {
    pub fn new(session: FeedSession, viewport: ListViewport) -> Self {
        Self {
            session,
            viewport,
            selected: None,
            quit: false,
            status: "Starting…".into(),
            exposures: 0,
            scrolled: false,
            idle_pending: false,
            added: 0,
            heights: Vec::new(),
        }
    }

    /// Begin exposure tracking and request the first page.
    pub fn start(&mut self) {
        self.session.start(Box::new(self.viewport.clone()));
        self.session.load_next_page();
    }

    /// Once per frame: fold in background results, keep the viewport in step
    /// with the list, run exposure passes, and react to events.
    pub fn tick(&mut self) {
        self.session.pump();
        if self.sync_layout() {
            self.session.on_data_set_changed();
        }

        if std::mem::take(&mut self.scrolled) {
            self.session.on_scrolled();
            self.idle_pending = true;
        } else if std::mem::take(&mut self.idle_pending) {
            self.session.on_scroll_idle();
        }

        for event in self.session.drain_events() {
            self.handle_event(event);
        }
        self.clamp_selection();
    }

    /// Returns whether any row height changed.
    fn sync_layout(&mut self) -> bool {
        let heights: Vec<u16> = self.session.items().iter().map(rows_for).collect();
        if heights == self.heights {
            return false;
        }
        self.viewport.set_heights(heights.iter().map(|&h| f32::from(h)));
        self.heights = heights;
        true
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Loader(event) => self.on_loader_event(event),
            SessionEvent::Exposure(_) => self.exposures += 1,
            SessionEvent::Playback(event) => self.on_playback_event(event),
        }
    }

    fn on_loader_event(&mut self, event: LoaderEvent) {
        match event {
            LoaderEvent::Started => self.status = "Loading…".into(),
            LoaderEvent::Complete(items) => {
                self.status = format!("Loaded {} items", items.len());
                if self.selected.is_none() && !self.session.items().is_empty() {
                    self.selected = Some(0);
                }
                if self.session.playback().state() == PlaybackState::Idle {
                    if let Some(first) = self.session.autoplay_candidate(0) {
                        self.play(first);
                    }
                }
            }
            LoaderEvent::Error(reason) => self.status = format!("Load failed: {reason}"),
            LoaderEvent::Reset => {
                self.selected = None;
                self.viewport.scroll_by(f32::MIN);
            }
            LoaderEvent::RangeInserted { .. }
            | LoaderEvent::RangeRemoved { .. }
            | LoaderEvent::RangeChanged { .. } => {}
        }
    }

    fn on_playback_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Started(item) => self.status = format!("Playing {}", item.title),
            PlaybackEvent::Paused { item, position_ms } => {
                self.status = format!("Paused {} at {}", item.title, format_ms(position_ms));
            }
            PlaybackEvent::Stopped(item) => self.status = format!("Stopped {}", item.title),
            PlaybackEvent::Completed(item) => {
                self.status = format!("Finished {}", item.title);
                let next = self
                    .session
                    .loader()
                    .position_of(item.id)
                    .and_then(|index| self.session.autoplay_candidate(index + 1));
                if let Some(next) = next {
                    self.play(next);
                }
            }
            PlaybackEvent::Error { item, error } => {
                self.status = format!("Cannot play {}: {error}", item.title);
            }
            PlaybackEvent::PositionNotSaved { reason, .. } => {
                self.status = format!("Position not saved: {reason}");
            }
        }
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        let len = self.session.items().len();
        if len == 0 {
            return;
        }
        let i = match self.selected {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.select(i);
    }

    pub fn select_previous(&mut self) {
        if self.session.items().is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.select(i);
    }

    pub fn select_first(&mut self) {
        if !self.session.items().is_empty() {
            self.select(0);
        }
    }

    pub fn select_last(&mut self) {
        let len = self.session.items().len();
        if len > 0 {
            self.select(len - 1);
        }
    }

    fn select(&mut self, index: usize) {
        self.selected = Some(index);
        self.sync_layout();
        if self.viewport.reveal(index) {
            self.scrolled = true;
        }
        if self.session.loader().should_show_load_more(index) {
            self.session.load_next_page();
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.session.items().len();
        self.selected = match self.selected {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => None,
        };
    }

    // -- actions -------------------------------------------------------------

    /// Pause, resume, or start the selected video.
    pub fn toggle_play(&mut self) {
        let Some(index) = self.selected else {
            return;
        };
        let Some(item) = self.session.items().get(index).cloned() else {
            return;
        };
        let surface = move || -> Box<dyn MediaSurface> {
            Box::new(SimulatedSurface::for_item(&item, PREPARE_DELAY))
        };
        if let Err(err) = self.session.toggle_item(index, surface) {
            self.status = err.to_string();
        }
    }

    fn play(&mut self, index: usize) {
        let Some(item) = self.session.items().get(index) else {
            return;
        };
        let surface = Box::new(SimulatedSurface::for_item(item, PREPARE_DELAY));
        if let Err(err) = self.session.play_item(index, surface) {
            self.status = err.to_string();
        }
    }

    pub fn load_next(&mut self) {
        if !self.session.load_next_page() {
            self.status = if self.session.loader().is_loading() {
                "Already loading".into()
            } else {
                "No more items".into()
            };
        }
    }

    pub fn refresh(&mut self) {
        self.session.refresh();
    }

    /// Add the next of the four demo posts at the top of the feed.
    pub fn add_sample(&mut self) {
        let samples = sample_items();
        let mut item = samples[self.added % samples.len()].clone();
        self.added += 1;
        item.title = format!("{} #{}", item.title, self.added);
        match self.session.add_item(item) {
            Ok(id) => {
                self.status = format!("Added {id}");
                self.select(0);
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    pub fn delete_selected(&mut self) {
        let Some(index) = self.selected else {
            return;
        };
        match self.session.remove_item(index) {
            Ok(item) => self.status = format!("Deleted {}", item.title),
            Err(err) => self.status = err.to_string(),
        }
        self.clamp_selection();
    }

    pub fn toggle_favorite(&mut self) {
        let Some(index) = self.selected else {
            return;
        };
        match self.session.toggle_favorite(index) {
            Ok(true) => self.status = "Marked favorite".into(),
            Ok(false) => self.status = "Unmarked favorite".into(),
            Err(err) => self.status = err.to_string(),
        }
    }

    pub fn toggle_layout(&mut self) {
        let Some(index) = self.selected else {
            return;
        };
        if let Err(err) = self.session.toggle_layout(index) {
            self.status = err.to_string();
        }
    }

    pub fn shutdown(&mut self) {
        self.session.shutdown();
    }
}

/// `m:ss` for a millisecond position.
pub fn format_ms(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}
