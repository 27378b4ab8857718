use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, KeyEvent, KeyEventKind, MouseEvent};

pub enum Event {
    Key(KeyEvent),
    KeyRelease(KeyEvent),
    Mouse(MouseEvent),
    Tick,
}

pub struct EventHandler {
    rx: mpsc::Receiver<Event>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                // Ticks keep their rate even under a stream of mouse motion.
                let timeout = tick_rate.saturating_sub(last_tick.elapsed());
                if event::poll(timeout).unwrap_or(false) {
                    let sent = match event::read() {
                        Ok(event::Event::Key(key)) => match key.kind {
                            KeyEventKind::Press | KeyEventKind::Repeat => tx.send(Event::Key(key)),
                            KeyEventKind::Release => tx.send(Event::KeyRelease(key)),
                        },
                        Ok(event::Event::Mouse(mouse)) => tx.send(Event::Mouse(mouse)),
                        Ok(_) => Ok(()),
                        Err(e) => {
                            tracing::warn!(error = %e, "reading terminal event failed");
                            Ok(())
                        }
                    };
                    if sent.is_err() {
                        return;
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    if tx.send(Event::Tick).is_err() {
                        return;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { rx }
    }

    pub fn next(&self) -> Result<Event> {
        self.rx.recv().context("event thread stopped")
    }
}
