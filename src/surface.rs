//! The media surface boundary.
//!
//! A [`MediaSurface`] is whatever actually decodes and shows video.  The
//! coordinator binds it to one URL at a time.  Surfaces report back
//! asynchronously through the [`SurfaceSignals`] handle they receive on
//! [`bind`](MediaSurface::bind); the handle may be cloned and moved to any
//! thread, and every signal is marshalled back onto the owner context.

use tokio::sync::mpsc;

/// A playback target controlled by the
/// [`PlaybackCoordinator`](crate::playback::PlaybackCoordinator).
pub trait MediaSurface {
    /// Start loading `url`.  Report readiness via `signals.prepared()`.
    fn bind(&mut self, url: &str, signals: SurfaceSignals);

    fn seek(&mut self, position_ms: u64);

    fn play(&mut self);

    fn pause(&mut self);

    /// Drop the binding.  No signal may be sent after this.
    fn release(&mut self);

    /// Current playback position.
    fn position_ms(&self) -> u64;
}

/// A signal from a surface or a timer, tagged with the session it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSignal {
    pub(crate) session: u64,
    pub(crate) kind: SignalKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignalKind {
    Prepared,
    Completed(u64),
    Error(i32),
    Timeout,
}

/// Cloneable sender a surface uses to report its progress.
#[derive(Debug, Clone)]
pub struct SurfaceSignals {
    session: u64,
    tx: mpsc::UnboundedSender<PlaybackSignal>,
}

impl SurfaceSignals {
    pub(crate) fn new(session: u64, tx: mpsc::UnboundedSender<PlaybackSignal>) -> Self {
        Self { session, tx }
    }

    pub fn prepared(&self) {
        self.send(SignalKind::Prepared);
    }

    pub fn completed(&self, position_ms: u64) {
        self.send(SignalKind::Completed(position_ms));
    }

    pub fn error(&self, code: i32) {
        self.send(SignalKind::Error(code));
    }

    pub(crate) fn timed_out(&self) {
        self.send(SignalKind::Timeout);
    }

    fn send(&self, kind: SignalKind) {
        // A closed channel means the coordinator is gone.
        let _ = self.tx.send(PlaybackSignal {
            session: self.session,
            kind,
        });
    }
}
