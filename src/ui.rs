//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## For contributors
//!
//! * The layout is a two-row split: the feed on top and a one-line status
//!   bar at the bottom.
//! * The feed is not a ratatui `List`.  Rows are placed exactly where
//!   [`ListViewport`](feed_session::ListViewport) says they are, so what is
//!   drawn is what the exposure tracker measures.  An item's line count must
//!   match [`rows_for`](crate::app::rows_for).
//! * [`ratatui`] is the TUI framework; see its docs for widget details.

use feed_session::{ExposureStage, FeedItem, LayoutMode, Media, PlaybackState};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{format_ms, App};

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [main_area, status_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_feed(app, frame, main_area);
    draw_status_bar(app, frame, status_area);
}

/// Render the rows the viewport reports as visible.
fn draw_feed(app: &mut App, frame: &mut Frame, area: Rect) {
    let title = if app.session.loader().is_loading() {
        " Feed (loading…) "
    } else {
        " Feed "
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    app.viewport.set_screen_height(f32::from(inner.height));

    for (index, rect) in app.viewport.visible_rects() {
        let Some(item) = app.session.items().get(index) else {
            continue;
        };
        let top = rect.top.max(0.0);
        let bottom = rect.bottom.min(f32::from(inner.height));
        if bottom <= top {
            continue;
        }
        let row_area = Rect {
            x: inner.x,
            y: inner.y + top as u16,
            width: inner.width,
            height: (bottom - top) as u16,
        };
        // Rows scrolled off the top are skipped, not squeezed.
        let skip = (top - rect.top) as u16;
        let lines = item_lines(app, index, item, inner.width);
        frame.render_widget(Paragraph::new(lines).scroll((skip, 0)), row_area);
    }
}

/// Exactly [`rows_for`](crate::app::rows_for) lines describing `item`.
fn item_lines<'a>(app: &App, index: usize, item: &'a FeedItem, width: u16) -> Vec<Line<'a>> {
    let selected = app.selected == Some(index);
    let title_style = if selected {
        Style::default()
            .add_modifier(Modifier::BOLD)
            .bg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };

    let mut lines = vec![Line::from(vec![
        Span::raw(if selected { "▸ " } else { "  " }),
        Span::styled(if item.favorite { "★ " } else { "" }, Style::default().fg(Color::Yellow)),
        Span::styled(item.title.as_str(), title_style),
        Span::raw("  "),
        Span::styled(
            format!("{} {}", item.id, item.created_at.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ),
    ])];

    if item.layout == LayoutMode::Single {
        lines.push(Line::from(Span::raw(format!("  {}", item.body))));
    }
    lines.push(media_line(app, item));

    let stage = app.session.tracker().stage_of(item.id);
    lines.push(Line::from(Span::styled(
        format!("  seen: {} ({})", stage_label(stage), stage.value()),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
        "─".repeat(usize::from(width)),
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

fn media_line<'a>(app: &App, item: &FeedItem) -> Line<'a> {
    match &item.media {
        Media::Image { width, height, .. } => Line::from(Span::styled(
            format!("  ▣ image {width}×{height}"),
            Style::default().fg(Color::Cyan),
        )),
        Media::Video { duration_ms, .. } => {
            let playback = app.session.playback();
            let active = playback.active_item().is_some_and(|active| active.id == item.id);
            let (marker, colour) = match playback.state() {
                _ if !active => ("", Color::Magenta),
                PlaybackState::Preparing => (" [buffering]", Color::Yellow),
                PlaybackState::Playing => (" [playing]", Color::Green),
                PlaybackState::Paused => (" [paused]", Color::Yellow),
                PlaybackState::Idle => ("", Color::Magenta),
            };
            Line::from(Span::styled(
                format!(
                    "  ▶ video {} resume {}{marker}",
                    format_ms(*duration_ms),
                    format_ms(playback.resume_position(item)),
                ),
                Style::default().fg(colour),
            ))
        }
    }
}

fn stage_label(stage: ExposureStage) -> &'static str {
    match stage {
        ExposureStage::Unseen => "never",
        ExposureStage::Seen => "glimpsed",
        ExposureStage::Partial30 => "30%",
        ExposureStage::Partial50 => "half",
        ExposureStage::Full => "fully",
    }
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("{} items", app.session.items().len()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{} exposures", app.exposures),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  q quit  j/k scroll  space play  n more  r refresh  a add  d del  f fav  l layout"),
    ]));
    frame.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use feed_session::{EngineConfig, FeedSession, ListViewport, MemoryStore};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|c| c.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    async fn loaded_app() -> App {
        let store = Arc::new(MemoryStore::with_sample_data());
        let session = FeedSession::new(store, &EngineConfig::default());
        let mut app = App::new(session, ListViewport::new(0.0));
        app.start();
        app.session.next_wake().await;
        app.tick();
        app
    }

    #[test]
    fn draw_does_not_panic_with_no_items() {
        let store = Arc::new(MemoryStore::new());
        let session = FeedSession::new(store, &EngineConfig::default());
        let mut app = App::new(session, ListViewport::new(0.0));

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();
        assert!(screen_text(&terminal).contains("0 items"));
    }

    #[tokio::test]
    async fn draw_shows_items_and_status() {
        let mut app = loaded_app().await;
        app.status = "OK".to_string();

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("4 items"), "status bar should show item count");
        assert!(text.contains("Grid video"));
        assert!(text.contains("image 400"));
    }

    #[tokio::test]
    async fn draw_sizes_the_viewport_to_the_feed_area() {
        let mut app = loaded_app().await;
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();

        // 12 rows minus the status bar and two borders.
        assert_eq!(
            feed_session::ViewportProvider::screen_height(&app.viewport),
            9.0
        );
    }

    #[tokio::test]
    async fn draw_survives_a_partially_scrolled_row() {
        let mut app = loaded_app().await;
        let mut terminal = Terminal::new(TestBackend::new(80, 10)).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();

        app.viewport.scroll_by(2.0);
        terminal.draw(|f| draw(&mut app, f)).unwrap();
        assert!(!screen_text(&terminal).contains("Grid video"), "first title scrolled off");
    }

    #[tokio::test]
    async fn rows_show_the_exposure_stage_and_its_level() {
        let mut app = loaded_app().await;
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();

        let stage = app.session.tracker().stage_of(app.session.items()[0].id);
        let expected = format!("seen: {} ({})", stage_label(stage), stage.value());
        assert!(screen_text(&terminal).contains(&expected));
    }
}
