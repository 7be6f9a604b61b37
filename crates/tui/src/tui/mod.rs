use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tasklist_core::{HttpGateway, TaskGateway};

use crate::config::AppConfig;

mod app;
mod buffer;
mod constants;
mod filters;
mod helpers;

use app::App;
use constants::TICK_RATE;

/// Raw mode plus the alternate screen, undone on drop so an error or panic
/// inside the loop still leaves a usable shell.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn open() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let mut terminal =
            Terminal::new(CrosstermBackend::new(stdout)).context("failed to initialize terminal")?;
        terminal.hide_cursor().context("failed to hide cursor")?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if let Err(err) = disable_raw_mode() {
            tracing::warn!(%err, "failed to disable raw mode");
        }
        if let Err(err) = execute!(self.terminal.backend_mut(), LeaveAlternateScreen) {
            tracing::warn!(%err, "failed to leave alternate screen");
        }
        let _ = self.terminal.show_cursor();
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let gateway = HttpGateway::new(config.api_url(), config.request_timeout())?;
    tracing::info!(api_url = %config.api_url(), "starting interactive session");

    // First fetch happens before the screen switches so the opening frame
    // already has rows.
    let mut app = App::new(config, Arc::new(gateway), runtime);
    app.load();

    let mut session = TerminalSession::open()?;
    let result = event_loop(&mut session.terminal, &mut app);
    drop(session);

    tracing::info!("interactive session closed");
    result
}

fn event_loop<G: TaskGateway + 'static>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App<G>,
) -> Result<()> {
    let mut last_tick = Instant::now();
    while !app.should_quit() {
        terminal.draw(|f| app.draw(f))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key)?;
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
    Ok(())
}
