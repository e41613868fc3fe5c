//! Test doubles shared by the unit test modules.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::StoreError;
use crate::exposure::{Rect, ViewportProvider};
use crate::item::{FeedItem, ItemId};
use crate::store::{FeedStore, MemoryStore};
use crate::surface::{MediaSurface, SurfaceSignals};

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Collects every event handed to the listener built by [`Recorder::sink`].
pub struct Recorder<T> {
    seen: Rc<RefCell<Vec<T>>>,
}

impl<T: Clone + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            seen: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn sink(&self) -> impl FnMut(&T) + 'static {
        let seen = self.seen.clone();
        move |event: &T| seen.borrow_mut().push(event.clone())
    }

    /// Everything recorded so far; the recorder starts over empty.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.seen.borrow_mut())
    }

    pub fn count(&self, pred: impl Fn(&T) -> bool) -> usize {
        self.seen.borrow().iter().filter(|event| pred(event)).count()
    }
}

// ---------------------------------------------------------------------------
// FlakyStore
// ---------------------------------------------------------------------------

/// A [`MemoryStore`] wrapper whose calls can be made to fail on demand.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    fail_next_page: AtomicBool,
    fail_updates: AtomicBool,
    fail_positions: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_next_page: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
            fail_positions: AtomicBool::new(false),
        }
    }

    /// The next `page` call fails once.
    pub fn fail_next_page(&self, fail: bool) {
        self.fail_next_page.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_positions(&self, fail: bool) {
        self.fail_positions.store(fail, Ordering::SeqCst);
    }

    fn backend(op: &str) -> StoreError {
        StoreError::Backend(format!("{op}: injected failure"))
    }
}

impl FeedStore for FlakyStore {
    fn insert(&self, item: &FeedItem) -> Result<ItemId, StoreError> {
        self.inner.insert(item)
    }

    fn delete(&self, id: ItemId) -> Result<usize, StoreError> {
        self.inner.delete(id)
    }

    fn update_position(&self, id: ItemId, position_ms: u64) -> Result<usize, StoreError> {
        if self.fail_positions.load(Ordering::SeqCst) {
            return Err(Self::backend("update_position"));
        }
        self.inner.update_position(id, position_ms)
    }

    fn update(&self, item: &FeedItem) -> Result<usize, StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Self::backend("update"));
        }
        self.inner.update(item)
    }

    fn page(&self, page_index: usize, page_size: usize) -> Result<Vec<FeedItem>, StoreError> {
        if self.fail_next_page.swap(false, Ordering::SeqCst) {
            return Err(Self::backend("page"));
        }
        self.inner.page(page_index, page_size)
    }

    fn all(&self) -> Result<Vec<FeedItem>, StoreError> {
        self.inner.all()
    }

    fn get(&self, id: ItemId) -> Result<Option<FeedItem>, StoreError> {
        self.inner.get(id)
    }

    fn clear(&self) -> Result<usize, StoreError> {
        self.inner.clear()
    }

    fn replace_all(&self, items: &[FeedItem]) -> Result<(), StoreError> {
        self.inner.replace_all(items)
    }
}

// ---------------------------------------------------------------------------
// FakeViewport
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ViewportState {
    range: Option<(usize, usize)>,
    rects: HashMap<usize, Option<Rect>>,
}

/// A viewport whose answers are set directly by the test.  Every item is
/// 100 units tall; `set_ratio` shows the given fraction of it.
#[derive(Clone)]
pub struct FakeViewport {
    screen_height: f32,
    state: Rc<RefCell<ViewportState>>,
}

impl FakeViewport {
    const ITEM_HEIGHT: f32 = 100.0;

    pub fn new(screen_height: f32) -> Self {
        Self {
            screen_height,
            state: Rc::default(),
        }
    }

    pub fn set_range(&self, range: Option<(usize, usize)>) {
        self.state.borrow_mut().range = range;
    }

    pub fn set_ratio(&self, index: usize, ratio: f32) {
        let rect = Rect::new(0.0, ratio * Self::ITEM_HEIGHT);
        self.state.borrow_mut().rects.insert(index, Some(rect));
    }

    pub fn hide(&self, index: usize) {
        self.state.borrow_mut().rects.insert(index, None);
    }
}

impl ViewportProvider for FakeViewport {
    fn visible_index_range(&self) -> Option<(usize, usize)> {
        self.state.borrow().range
    }

    fn visible_rect(&self, index: usize) -> Option<Rect> {
        self.state.borrow().rects.get(&index).copied().flatten()
    }

    fn total_height(&self, _index: usize) -> f32 {
        Self::ITEM_HEIGHT
    }

    fn screen_height(&self) -> f32 {
        self.screen_height
    }
}

// ---------------------------------------------------------------------------
// FakeSurface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Bind(String),
    Seek(u64),
    Play,
    Pause,
    Release,
}

#[derive(Default)]
struct SurfaceState {
    calls: Vec<SurfaceCall>,
    signals: Option<SurfaceSignals>,
    position_ms: u64,
}

/// A surface that records every call.  Signals are sent by hand through the
/// paired [`SurfaceRemote`].
pub struct FakeSurface {
    state: Rc<RefCell<SurfaceState>>,
}

impl FakeSurface {
    pub fn new() -> (Box<dyn MediaSurface>, SurfaceRemote) {
        let state = Rc::new(RefCell::new(SurfaceState::default()));
        let surface = Box::new(FakeSurface {
            state: state.clone(),
        });
        (surface, SurfaceRemote { state })
    }
}

impl MediaSurface for FakeSurface {
    fn bind(&mut self, url: &str, signals: SurfaceSignals) {
        let mut state = self.state.borrow_mut();
        state.calls.push(SurfaceCall::Bind(url.to_string()));
        state.signals = Some(signals);
    }

    fn seek(&mut self, position_ms: u64) {
        let mut state = self.state.borrow_mut();
        state.calls.push(SurfaceCall::Seek(position_ms));
        state.position_ms = position_ms;
    }

    fn play(&mut self) {
        self.state.borrow_mut().calls.push(SurfaceCall::Play);
    }

    fn pause(&mut self) {
        self.state.borrow_mut().calls.push(SurfaceCall::Pause);
    }

    fn release(&mut self) {
        self.state.borrow_mut().calls.push(SurfaceCall::Release);
    }

    fn position_ms(&self) -> u64 {
        self.state.borrow().position_ms
    }
}

/// Test-side handle of a [`FakeSurface`].  Signals keep working after
/// release so tests can replay late callbacks.
pub struct SurfaceRemote {
    state: Rc<RefCell<SurfaceState>>,
}

impl SurfaceRemote {
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.borrow().calls.clone()
    }

    pub fn set_position(&self, position_ms: u64) {
        self.state.borrow_mut().position_ms = position_ms;
    }

    fn signals(&self) -> SurfaceSignals {
        self.state
            .borrow()
            .signals
            .clone()
            .expect("surface was never bound")
    }

    pub fn prepared(&self) {
        self.signals().prepared();
    }

    pub fn completed(&self, position_ms: u64) {
        self.signals().completed(position_ms);
    }

    pub fn error(&self, code: i32) {
        self.signals().error(code);
    }
}
