//! A timer-driven [`MediaSurface`] for hosts without a real decoder.
//!
//! [`SimulatedSurface`] reports "prepared" a fixed delay after `bind`, then
//! advances its position on the tokio clock while playing and reports
//! completion when the position reaches the item's duration.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::item::{FeedItem, Media};
use crate::surface::{MediaSurface, SurfaceSignals};

/// Fallback length for items that do not know their duration.
const DEFAULT_DURATION_MS: u64 = 30_000;

#[derive(Debug)]
pub struct SimulatedSurface {
    duration_ms: u64,
    prepare_delay: Duration,
    signals: Option<SurfaceSignals>,
    position_ms: u64,
    playing_since: Option<Instant>,
    timer: Option<JoinHandle<()>>,
}

impl SimulatedSurface {
    pub fn new(duration_ms: u64, prepare_delay: Duration) -> Self {
        Self {
            duration_ms,
            prepare_delay,
            signals: None,
            position_ms: 0,
            playing_since: None,
            timer: None,
        }
    }

    /// A surface as long as `item`'s video.
    pub fn for_item(item: &FeedItem, prepare_delay: Duration) -> Self {
        let duration_ms = match item.media {
            Media::Video { duration_ms, .. } if duration_ms > 0 => duration_ms,
            _ => DEFAULT_DURATION_MS,
        };
        Self::new(duration_ms, prepare_delay)
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn schedule_completion(&mut self) {
        self.cancel_timer();
        let Some(signals) = self.signals.clone() else {
            return;
        };
        let remaining = Duration::from_millis(self.duration_ms.saturating_sub(self.position_ms));
        let duration_ms = self.duration_ms;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            signals.completed(duration_ms);
        }));
    }
}

impl MediaSurface for SimulatedSurface {
    fn bind(&mut self, _url: &str, signals: SurfaceSignals) {
        self.cancel_timer();
        self.position_ms = 0;
        self.playing_since = None;
        self.signals = Some(signals.clone());

        let delay = self.prepare_delay;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            signals.prepared();
        }));
    }

    fn seek(&mut self, position_ms: u64) {
        self.position_ms = position_ms.min(self.duration_ms);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
            self.schedule_completion();
        }
    }

    fn play(&mut self) {
        if self.signals.is_none() || self.playing_since.is_some() {
            return;
        }
        self.playing_since = Some(Instant::now());
        self.schedule_completion();
    }

    fn pause(&mut self) {
        self.position_ms = self.position_ms();
        self.playing_since = None;
        self.cancel_timer();
    }

    fn release(&mut self) {
        self.cancel_timer();
        self.signals = None;
        self.playing_since = None;
    }

    fn position_ms(&self) -> u64 {
        let played = self
            .playing_since
            .map(|since| since.elapsed().as_millis() as u64)
            .unwrap_or(0);
        (self.position_ms + played).min(self.duration_ms)
    }
}

impl Drop for SimulatedSurface {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::LayoutMode;
    use crate::surface::{PlaybackSignal, SignalKind};
    use tokio::sync::mpsc;

    const DELAY: Duration = Duration::from_millis(300);

    fn bound(duration_ms: u64) -> (SimulatedSurface, mpsc::UnboundedReceiver<PlaybackSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut surface = SimulatedSurface::new(duration_ms, DELAY);
        surface.bind("sim://clip", SurfaceSignals::new(7, tx));
        (surface, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn prepares_after_the_delay() {
        let (_surface, mut rx) = bound(1_000);
        let started = Instant::now();
        let signal = rx.recv().await.unwrap();
        assert_eq!(signal.kind, SignalKind::Prepared);
        assert_eq!(signal.session, 7);
        assert!(started.elapsed() >= DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn plays_to_completion_from_the_seek_point() {
        let (mut surface, mut rx) = bound(10_000);
        rx.recv().await.unwrap();

        surface.seek(4_000);
        surface.play();
        let started = Instant::now();
        let signal = rx.recv().await.unwrap();
        assert_eq!(signal.kind, SignalKind::Completed(10_000));
        assert!(started.elapsed() >= Duration::from_millis(6_000));
        assert_eq!(surface.position_ms(), 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_the_position() {
        let (mut surface, mut rx) = bound(10_000);
        rx.recv().await.unwrap();

        surface.play();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        surface.pause();
        assert_eq!(surface.position_ms(), 2_500);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(surface.position_ms(), 2_500);
        assert!(rx.try_recv().is_err(), "no completion while paused");
    }

    #[tokio::test(start_paused = true)]
    async fn release_silences_pending_timers() {
        let (mut surface, mut rx) = bound(1_000);
        surface.release();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());

        surface.play();
        assert!(!surface.is_playing(), "play without a binding is ignored");
    }

    #[test]
    fn duration_comes_from_the_video_item() {
        let video = FeedItem::video("v", "", "u", "c", 1, 1, 42_000, LayoutMode::Single);
        assert_eq!(SimulatedSurface::for_item(&video, DELAY).duration_ms, 42_000);

        let image = FeedItem::image("i", "", "u", 1, 1, LayoutMode::Single);
        assert_eq!(SimulatedSurface::for_item(&image, DELAY).duration_ms, DEFAULT_DURATION_MS);
    }
}
