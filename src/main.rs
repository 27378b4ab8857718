mod app;
mod calculator;
mod config;
mod event;
mod games;
mod logging;
mod ui;

use std::io;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use app::App;
use config::Config;
use event::{Event, EventHandler};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

fn main() -> Result<()> {
    let config = Config::from_env();
    logging::init(&config)?;
    tracing::info!(tick_ms = config.tick_rate.as_millis() as u64, "starting");

    // Release events and the caps lock state only arrive with the kitty
    // keyboard protocol.
    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    let mut terminal = setup_terminal(enhanced)?;

    let result = run(&mut terminal, &config);
    let restored = restore_terminal(&mut terminal, enhanced);
    tracing::info!("shutdown");
    shutdown_result(result, restored)
}

/// The loop's error wins over a restore failure; both are logged.
fn shutdown_result(result: Result<()>, restored: Result<()>) -> Result<()> {
    if let Err(e) = &result {
        tracing::error!(error = %e, "exited with error");
    }
    if let Err(e) = &restored {
        tracing::error!(error = %e, "failed to restore terminal");
    }
    result.and(restored)
}

fn setup_terminal(enhanced: bool) -> Result<Term> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    if enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                    | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS
            )
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal")?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Term, enhanced: bool) -> Result<()> {
    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run(terminal: &mut Term, config: &Config) -> Result<()> {
    let mut app = App::new();
    let events = EventHandler::new(config.tick_rate);

    loop {
        terminal.draw(|frame| ui::render(frame, &mut app))?;

        match events.next()? {
            Event::Tick => app.on_tick(),
            Event::Key(key) => app.on_key(key),
            Event::KeyRelease(key) => app.on_key_release(key),
            Event::Mouse(mouse) => app.on_mouse(mouse),
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn loop_error_is_not_masked_by_restore_failure() {
        let err = shutdown_result(Err(anyhow!("draw failed")), Err(anyhow!("restore failed"))).unwrap_err();
        assert_eq!(err.to_string(), "draw failed");

        let err = shutdown_result(Ok(()), Err(anyhow!("restore failed"))).unwrap_err();
        assert_eq!(err.to_string(), "restore failed");

        assert!(shutdown_result(Ok(()), Ok(())).is_ok());
    }
}
