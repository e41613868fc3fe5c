//! feed-session - a terminal playground for the feed session engine.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌─────────────┐ SessionEvent ┌──────────┐  draw()  ┌──────────┐
//! │ FeedSession │ ───────────► │  app.rs  │ ───────► │  ui.rs   │
//! │  (library)  │  (per tick)  │ (state)  │          │ (render) │
//! └─────────────┘              └──────────┘          └──────────┘
//!        ▲                          ▲
//!        │ next_wake()              │ handle_key_event()
//!   tokio runtime              ┌──────────┐
//!  (fetches, timers)           │ input.rs │
//!                              └──────────┘
//! ```
//!
//! * **`app`**: owns the session, the viewport, and the selection.
//! * **`ui`**: pure rendering, reads `App` state and draws widgets.
//! * **`input`**: maps key events to `App` mutations.
//! * **`main`**: wires everything together. It loads config, sets up the
//!   terminal and runs the event loop on a current-thread runtime.
//!
//! Set `FEED_SESSION_LOG=/path/to/file` to get a `tracing` log; the filter
//! comes from `RUST_LOG`.

mod app;
mod input;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use feed_session::{EngineConfig, FeedSession, ListViewport, MemoryStore};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

/// Log to the file named by `FEED_SESSION_LOG`, if set.  Logging to the
/// terminal would draw over the alternate screen.
fn init_tracing() -> Result<()> {
    let Some(path) = std::env::var_os("FEED_SESSION_LOG") else {
        return Ok(());
    };
    let file = std::fs::File::create(&path)
        .with_context(|| format!("cannot create log file {}", PathBuf::from(&path).display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("feed_session=debug")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    install_panic_hook();
    init_tracing()?;

    // -- parse arguments -----------------------------------------------------
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = EngineConfig::load(config_path.as_deref()).context("invalid configuration")?;
    info!(?config, "starting");

    // Everything the session owns lives on this one thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: EngineConfig) -> Result<()> {
    let store = Arc::new(MemoryStore::with_sample_data());

    // -- terminal setup (Drop restores on exit or panic) -------------------
    let mut guard = TerminalGuard::new()?;
    let session = FeedSession::new(store, &config);
    let mut app = App::new(session, ListViewport::default());
    app.start();

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Fold in session work and run exposure passes.
    //   2. Render the UI.
    //   3. Let the runtime run until the tick ends or a result arrives.
    //   4. Handle every key that came in meanwhile.
    let tick_rate = Duration::from_millis(100);

    loop {
        // 1. Session work
        app.tick();

        // 2. Render
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        // 3. Wait; timers and fetch results are processed while we sleep
        tokio::select! {
            _ = tokio::time::sleep(tick_rate) => {}
            _ = app.session.next_wake() => {}
        }

        // 4. Handle input
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    app.shutdown();
    info!("bye");
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
