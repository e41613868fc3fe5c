//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions.  Adding a new keybinding is
//! a single match arm in [`handle_key_event`].
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a `KeyCode` match arm in [`handle_key_event`] that calls it.
//! 3. Update the help text in `ui::draw_status_bar`.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::App;

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char(' ') => app.toggle_play(),
        KeyCode::Char('n') => app.load_next(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('a') => app.add_sample(),
        KeyCode::Char('d') => app.delete_selected(),
        KeyCode::Char('f') => app.toggle_favorite(),
        KeyCode::Char('l') => app.toggle_layout(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crossterm::event::{KeyEventState, KeyModifiers};
    use feed_session::{EngineConfig, FeedSession, ListViewport, MemoryStore};

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        key(code, KeyEventKind::Press)
    }

    async fn loaded_app() -> App {
        let store = Arc::new(MemoryStore::with_sample_data());
        let session = FeedSession::new(store, &EngineConfig::default());
        let mut app = App::new(session, ListViewport::new(40.0));
        app.start();
        app.session.next_wake().await;
        app.tick();
        app
    }

    #[tokio::test]
    async fn quit_keys() {
        for code in [KeyCode::Char('q'), KeyCode::Esc] {
            let mut app = loaded_app().await;
            handle_key_event(&mut app, press(code));
            assert!(app.quit);
        }
    }

    #[tokio::test]
    async fn release_events_are_ignored() {
        let mut app = loaded_app().await;
        handle_key_event(&mut app, key(KeyCode::Char('q'), KeyEventKind::Release));
        handle_key_event(&mut app, key(KeyCode::Char('j'), KeyEventKind::Repeat));
        assert!(!app.quit);
        assert_eq!(app.selected, Some(0));
    }

    #[tokio::test]
    async fn navigation_keys_move_the_selection() {
        let mut app = loaded_app().await;
        handle_key_event(&mut app, press(KeyCode::Char('j')));
        assert_eq!(app.selected, Some(1));
        handle_key_event(&mut app, press(KeyCode::Char('G')));
        assert_eq!(app.selected, Some(3));
        handle_key_event(&mut app, press(KeyCode::Up));
        assert_eq!(app.selected, Some(2));
        handle_key_event(&mut app, press(KeyCode::Home));
        assert_eq!(app.selected, Some(0));
    }

    #[tokio::test]
    async fn edit_keys_reach_the_session() {
        let mut app = loaded_app().await;
        handle_key_event(&mut app, press(KeyCode::Char('f')));
        assert!(app.session.items()[0].favorite);

        handle_key_event(&mut app, press(KeyCode::Char('a')));
        assert_eq!(app.session.items().len(), 5);

        handle_key_event(&mut app, press(KeyCode::Char('d')));
        assert_eq!(app.session.items().len(), 4);
    }

    #[tokio::test]
    async fn unbound_keys_do_nothing() {
        let mut app = loaded_app().await;
        handle_key_event(&mut app, press(KeyCode::Char('z')));
        assert!(!app.quit);
        assert_eq!(app.session.items().len(), 4);
    }
}
