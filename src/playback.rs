//! Feed-wide video playback arbitration.
//!
//! [`PlaybackCoordinator`] owns the single playback session of a feed.  Any
//! [`setup_playback`](PlaybackCoordinator::setup_playback) preempts whatever
//! was active before, saving its watch position first, so two items can
//! never play at once.
//!
//! ```text
//!            setup                prepared               pause
//!   Idle ──────────► Preparing ──────────► Playing ◄──────────► Paused
//!    ▲                   │                   │        start        │
//!    └───────────────────┴── stop / completed / error / timeout ───┘
//! ```
//!
//! Surface callbacks and the prepare timeout arrive as [`PlaybackSignal`]s on
//! an internal channel.  Each signal carries the token of the session that
//! produced it, and signals for a session that is no longer current are
//! dropped.  A timeout that fires after "prepared" was already queued is
//! ignored because the session is marked prepared before the timeout is
//! looked at.
//!
//! Every public method is owner-context only and must run inside a tokio
//! runtime (the timeout is a spawned timer task).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::PlaybackError;
use crate::item::{FeedItem, ItemId};
use crate::store::FeedStore;
use crate::surface::{MediaSurface, PlaybackSignal, SignalKind, SurfaceSignals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Preparing,
    Playing,
    Paused,
}

/// Notifications for hosts.  Items are snapshots with the latest known
/// resume position.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Started(FeedItem),
    Paused { item: FeedItem, position_ms: u64 },
    Stopped(FeedItem),
    Completed(FeedItem),
    Error { item: FeedItem, error: PlaybackError },
    /// The position was kept in memory but the store refused it.
    PositionNotSaved { item_id: ItemId, reason: String },
}

struct Session {
    token: u64,
    item: FeedItem,
    surface: Box<dyn MediaSurface>,
    prepared: bool,
    timeout: Option<JoinHandle<()>>,
}

impl Session {
    fn cancel_timeout(&mut self) {
        if let Some(timer) = self.timeout.take() {
            timer.abort();
        }
    }
}

type Listener = Box<dyn FnMut(&PlaybackEvent)>;

pub struct PlaybackCoordinator {
    store: Arc<dyn FeedStore>,
    prepare_timeout: Duration,
    state: PlaybackState,
    session: Option<Session>,
    last_token: u64,
    /// Latest persisted position per item, so a stale caller copy of an item
    /// still resumes in the right place.
    resume_at: HashMap<ItemId, u64>,
    tx: mpsc::UnboundedSender<PlaybackSignal>,
    rx: mpsc::UnboundedReceiver<PlaybackSignal>,
    listener: Option<Listener>,
}

impl PlaybackCoordinator {
    pub fn new(store: Arc<dyn FeedStore>, prepare_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            prepare_timeout,
            state: PlaybackState::Idle,
            session: None,
            last_token: 0,
            resume_at: HashMap::new(),
            tx,
            rx,
            listener: None,
        }
    }

    pub fn set_listener(&mut self, listener: impl FnMut(&PlaybackEvent) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    fn emit(&mut self, event: PlaybackEvent) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&event);
        }
    }

    // -- queries -------------------------------------------------------------

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn active_item(&self) -> Option<&FeedItem> {
        self.session.as_ref().map(|session| &session.item)
    }

    pub fn is_prepared(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.prepared)
    }

    /// True only while `id` is the active item and actually playing.
    pub fn is_playing(&self, id: ItemId) -> bool {
        self.state == PlaybackState::Playing && self.active_item().is_some_and(|item| item.id == id)
    }

    /// Where `item` would resume if set up now.
    pub fn resume_position(&self, item: &FeedItem) -> u64 {
        self.resume_at
            .get(&item.id)
            .copied()
            .unwrap_or_else(|| item.last_position_ms())
    }

    // -- commands ------------------------------------------------------------

    /// Bind `surface` to `item` and start preparing.  Any active session is
    /// stopped first.  Non-video items and empty URLs are reported through
    /// [`PlaybackEvent::Error`] and leave the coordinator idle; the return
    /// value says whether preparation started.
    pub fn setup_playback(&mut self, item: &FeedItem, mut surface: Box<dyn MediaSurface>) -> bool {
        if self.state != PlaybackState::Idle {
            self.stop_playback();
        }

        let url = match item.video_url() {
            None => {
                self.reject(item, PlaybackError::NotVideo(item.id));
                return false;
            }
            Some(url) if url.trim().is_empty() => {
                self.reject(item, PlaybackError::MissingUrl(item.id));
                return false;
            }
            Some(url) => url.to_owned(),
        };

        self.last_token += 1;
        let token = self.last_token;
        let signals = SurfaceSignals::new(token, self.tx.clone());

        surface.bind(&url, signals.clone());
        let timeout = self.arm_timeout(signals);

        let mut item = item.clone();
        if let Some(&position) = self.resume_at.get(&item.id) {
            item.set_last_position_ms(position);
        }
        debug!(item = %item.id, %url, "preparing playback");
        self.session = Some(Session {
            token,
            item,
            surface,
            prepared: false,
            timeout: Some(timeout),
        });
        self.state = PlaybackState::Preparing;
        true
    }

    fn reject(&mut self, item: &FeedItem, error: PlaybackError) {
        warn!(item = %item.id, %error, "playback rejected");
        self.emit(PlaybackEvent::Error {
            item: item.clone(),
            error,
        });
    }

    fn arm_timeout(&self, signals: SurfaceSignals) -> JoinHandle<()> {
        let timeout = self.prepare_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            signals.timed_out();
        })
    }

    /// Play the prepared surface.  No-op while preparing, idle, or already
    /// playing.
    pub fn start_playback(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            trace!("start_playback without a session");
            return false;
        };
        if !session.prepared || self.state == PlaybackState::Playing {
            trace!(state = ?self.state, "start_playback ignored");
            return false;
        }
        session.surface.play();
        let item = session.item.clone();
        self.state = PlaybackState::Playing;
        debug!(item = %item.id, "playback started");
        self.emit(PlaybackEvent::Started(item));
        true
    }

    /// Pause and persist the position.  No-op unless playing.
    pub fn pause_playback(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            trace!(state = ?self.state, "pause_playback ignored");
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.surface.pause();
        let position_ms = session.surface.position_ms();
        self.persist(position_ms);
        self.state = PlaybackState::Paused;

        let Some(item) = self.active_item().cloned() else {
            return false;
        };
        debug!(item = %item.id, position_ms, "playback paused");
        self.emit(PlaybackEvent::Paused { item, position_ms });
        true
    }

    /// Persist the position, release the surface, and go idle.  Safe in any
    /// state; returns whether a session was stopped.
    pub fn stop_playback(&mut self) -> bool {
        let Some(item) = self.teardown(true, None) else {
            return false;
        };
        debug!(item = %item.id, "playback stopped");
        self.emit(PlaybackEvent::Stopped(item));
        true
    }

    /// Click behaviour: pause `item` if it is playing, resume it if it is the
    /// paused item, otherwise set it up on a surface from `surface`.
    pub fn toggle(
        &mut self,
        item: &FeedItem,
        surface: impl FnOnce() -> Box<dyn MediaSurface>,
    ) -> bool {
        if self.is_playing(item.id) {
            return self.pause_playback();
        }
        let paused_here = self.active_item().is_some_and(|active| active.id == item.id);
        if self.state == PlaybackState::Paused && paused_here {
            return self.start_playback();
        }
        self.setup_playback(item, surface())
    }

    /// Stop everything and drop the listener.  Used at session teardown.
    pub fn release(&mut self) {
        self.stop_playback();
        self.listener = None;
    }

    // -- signals -------------------------------------------------------------

    /// Wait for the next surface or timer signal.  Cancel-safe.
    pub async fn recv_signal(&mut self) -> Option<PlaybackSignal> {
        self.rx.recv().await
    }

    /// Handle every signal that has already arrived.
    pub fn drain_signals(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(signal) = self.rx.try_recv() {
            self.dispatch(signal);
            handled += 1;
        }
        handled
    }

    pub fn dispatch(&mut self, signal: PlaybackSignal) {
        let Some((token, prepared)) = self.session.as_ref().map(|s| (s.token, s.prepared)) else {
            trace!(?signal, "signal without a session");
            return;
        };
        if token != signal.session {
            trace!(?signal, current = token, "stale signal dropped");
            return;
        }

        match signal.kind {
            SignalKind::Prepared => self.on_prepared(),
            SignalKind::Completed(position_ms) => self.on_completed(position_ms),
            SignalKind::Error(code) => self.fail(PlaybackError::Surface(code)),
            SignalKind::Timeout if prepared => trace!("timeout after prepare ignored"),
            SignalKind::Timeout => self.fail(PlaybackError::PrepareTimeout),
        }
    }

    fn on_prepared(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.prepared {
            trace!("duplicate prepared signal");
            return;
        }
        // Cancel first: from here on the timeout must not count.
        session.cancel_timeout();
        session.prepared = true;

        let resume = session.item.last_position_ms();
        if resume > 0 {
            session.surface.seek(resume);
        }
        debug!(item = %session.item.id, resume, "surface prepared");
        self.start_playback();
    }

    fn on_completed(&mut self, position_ms: u64) {
        let Some(item) = self.teardown(true, Some(position_ms)) else {
            return;
        };
        debug!(item = %item.id, "playback completed");
        self.emit(PlaybackEvent::Stopped(item.clone()));
        self.emit(PlaybackEvent::Completed(item));
    }

    fn fail(&mut self, error: PlaybackError) {
        let Some(item) = self.active_item().cloned() else {
            return;
        };
        warn!(item = %item.id, %error, "playback failed");
        self.emit(PlaybackEvent::Error { item, error });
        self.teardown(false, None);
    }

    // -- internals -----------------------------------------------------------

    /// End the session.  The position is saved only when `persist` is set
    /// and the surface got as far as "prepared"; an unprepared surface has
    /// no meaningful position and must not clobber the saved one.
    fn teardown(&mut self, persist: bool, position_ms: Option<u64>) -> Option<FeedItem> {
        let session = self.session.as_ref()?;
        if persist && session.prepared {
            let position_ms = position_ms.unwrap_or_else(|| session.surface.position_ms());
            self.persist(position_ms);
        }

        let mut session = self.session.take()?;
        session.cancel_timeout();
        session.surface.release();
        self.state = PlaybackState::Idle;
        Some(session.item)
    }

    fn persist(&mut self, position_ms: u64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.item.set_last_position_ms(position_ms);
        let id = session.item.id;
        self.resume_at.insert(id, position_ms);

        match self.store.update_position(id, position_ms) {
            Ok(0) => warn!(item = %id, "no stored row for the played item"),
            Ok(_) => trace!(item = %id, position_ms, "position saved"),
            Err(err) => {
                warn!(item = %id, error = %err, "position not saved");
                self.emit(PlaybackEvent::PositionNotSaved {
                    item_id: id,
                    reason: err.to_string(),
                });
            }
        }
    }
}

impl Drop for PlaybackCoordinator {
    fn drop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.cancel_timeout();
        }
    }
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("state", &self.state)
            .field("active", &self.active_item().map(|item| item.id))
            .field("prepared", &self.is_prepared())
            .field("prepare_timeout", &self.prepare_timeout)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
