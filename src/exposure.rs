//! Exposure tracking: how much of each item the user actually saw.
//!
//! Every item id climbs a ladder of [`ExposureStage`]s, one rung per
//! evaluation pass at most:
//!
//! ```text
//! Unseen ─(ratio ≥ 0)─► Seen ─(≥ 0.3)─► Partial30 ─(≥ 0.5)─► Partial50 ─(≥ 1.0)─► Full
//! ```
//!
//! A pass that sees an item jump from 0 % straight to 90 % still moves it one
//! rung only; the next pass moves it again.  Stages never go down while the
//! tracker is running.  [`ExposureTracker::stop`] forgets everything.
//!
//! The tracker is owner-context only.  It holds no locks and never blocks:
//! one pass is a single synchronous walk over the visible range.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::item::{FeedItem, ItemId};

/// A monotonic visibility level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ExposureStage {
    #[default]
    Unseen,
    Seen,
    Partial30,
    Partial50,
    Full,
}

impl ExposureStage {
    /// The stage one rung up and the ratio needed to reach it.
    pub fn next(self) -> Option<(ExposureStage, f32)> {
        match self {
            Self::Unseen => Some((Self::Seen, 0.0)),
            Self::Seen => Some((Self::Partial30, 0.3)),
            Self::Partial30 => Some((Self::Partial50, 0.5)),
            Self::Partial50 => Some((Self::Full, 1.0)),
            Self::Full => None,
        }
    }

    /// Numeric level as reported to analytics (-1 for unseen up to 3).
    pub fn value(self) -> i8 {
        match self {
            Self::Unseen => -1,
            Self::Seen => 0,
            Self::Partial30 => 1,
            Self::Partial50 => 2,
            Self::Full => 3,
        }
    }
}

/// Emitted once per stage transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposureEvent {
    pub item_id: ItemId,
    pub stage: ExposureStage,
}

/// A vertical span in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(top: f32, bottom: f32) -> Self {
        Self { top, bottom }
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// What the tracker needs to know about the host's list view.
pub trait ViewportProvider {
    /// First and last item index currently on screen, both inclusive.
    fn visible_index_range(&self) -> Option<(usize, usize)>;

    /// The on-screen rectangle of the item at `index`, if it has one.
    fn visible_rect(&self, index: usize) -> Option<Rect>;

    /// Full laid-out height of the item at `index`.
    fn total_height(&self, index: usize) -> f32;

    /// Height of the screen the rectangles are clipped against.
    fn screen_height(&self) -> f32 {
        f32::INFINITY
    }
}

/// Fraction of an item's height that lies on screen.
///
/// Zero when there is no rectangle or the item has no height.
pub fn exposure_ratio(rect: Option<Rect>, total_height: f32, screen_height: f32) -> f32 {
    let Some(rect) = rect else {
        return 0.0;
    };
    if total_height <= 0.0 {
        return 0.0;
    }
    let top = rect.top.max(0.0);
    let bottom = rect.bottom.min(screen_height);
    (bottom - top).max(0.0) / total_height
}

/// Why an evaluation pass was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Start,
    ScrollDelta,
    ScrollIdle,
    DataSetChanged,
}

type Observer = Box<dyn FnMut(&ExposureEvent)>;

pub struct ExposureTracker {
    viewport: Option<Box<dyn ViewportProvider>>,
    stages: HashMap<ItemId, ExposureStage>,
    debounce: Duration,
    last_evaluation: Option<Instant>,
    observer: Option<Observer>,
}

impl ExposureTracker {
    pub fn new(debounce: Duration) -> Self {
        Self {
            viewport: None,
            stages: HashMap::new(),
            debounce,
            last_evaluation: None,
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: impl FnMut(&ExposureEvent) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn is_tracking(&self) -> bool {
        self.viewport.is_some()
    }

    pub fn stage_of(&self, id: ItemId) -> ExposureStage {
        self.stages.get(&id).copied().unwrap_or_default()
    }

    /// The tracked viewport's current visible range.
    pub fn visible_range(&self) -> Option<(usize, usize)> {
        self.viewport.as_deref()?.visible_index_range()
    }

    /// Begin tracking `viewport` and run one pass right away.  Replaces any
    /// viewport from an earlier `start` without clearing stages.
    pub fn start(&mut self, viewport: Box<dyn ViewportProvider>, items: &[FeedItem]) -> usize {
        self.viewport = Some(viewport);
        self.run(Trigger::Start, items)
    }

    /// Release the viewport and forget every stage.  Safe in any state.
    pub fn stop(&mut self) {
        self.viewport = None;
        self.stages.clear();
        self.last_evaluation = None;
    }

    /// Drop the stage of an item that left the feed.
    pub fn forget(&mut self, id: ItemId) {
        self.stages.remove(&id);
    }

    /// Scroll-delta pass, skipped if the last pass was less than the
    /// debounce interval ago.  Returns `None` when skipped.
    pub fn on_scrolled(&mut self, items: &[FeedItem]) -> Option<usize> {
        if let Some(last) = self.last_evaluation {
            if last.elapsed() < self.debounce {
                trace!("scroll pass debounced");
                return None;
            }
        }
        Some(self.run(Trigger::ScrollDelta, items))
    }

    pub fn on_scroll_idle(&mut self, items: &[FeedItem]) -> usize {
        self.run(Trigger::ScrollIdle, items)
    }

    pub fn on_data_set_changed(&mut self, items: &[FeedItem]) -> usize {
        self.run(Trigger::DataSetChanged, items)
    }

    /// One pass over the visible range.  Returns how many items changed
    /// stage.  Does nothing when not tracking.
    pub fn run(&mut self, trigger: Trigger, items: &[FeedItem]) -> usize {
        let Some(viewport) = self.viewport.as_deref() else {
            return 0;
        };
        self.last_evaluation = Some(Instant::now());

        if items.is_empty() {
            return 0;
        }
        let Some((first, last)) = viewport.visible_index_range() else {
            return 0;
        };
        let last = last.min(items.len() - 1);
        if first > last {
            return 0;
        }

        let screen_height = viewport.screen_height();
        let mut transitions = Vec::new();
        for (index, item) in items.iter().enumerate().take(last + 1).skip(first) {
            let ratio = exposure_ratio(
                viewport.visible_rect(index),
                viewport.total_height(index),
                screen_height,
            );
            let current = self.stages.get(&item.id).copied().unwrap_or_default();
            if let Some((next, threshold)) = current.next() {
                if ratio >= threshold {
                    self.stages.insert(item.id, next);
                    transitions.push(ExposureEvent {
                        item_id: item.id,
                        stage: next,
                    });
                }
            }
        }

        for event in &transitions {
            debug!(item = %event.item_id, stage = ?event.stage, ?trigger, "exposure stage reached");
            if let Some(observer) = self.observer.as_mut() {
                observer(event);
            }
        }
        transitions.len()
    }
}

impl std::fmt::Debug for ExposureTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExposureTracker")
            .field("tracking", &self.is_tracking())
            .field("stages", &self.stages)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
