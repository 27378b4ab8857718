pub mod catch_ball;
pub mod color_reaction;
pub mod memory_match;
pub mod minesweeper;
pub mod pong;
pub mod snake;
pub mod timer;
pub mod twenty48;

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, MouseEvent};
use ratatui::prelude::*;
use ratatui::widgets::*;

use catch_ball::CatchBall;
use color_reaction::ColorReaction;
use memory_match::MemoryMatch;
use minesweeper::Minesweeper;
use pong::Pong;
use snake::Snake;
use twenty48::Twenty48;

/// A running game. Constructing one starts it; dropping it stops it, along
/// with every timer it owns.
pub trait Game {
    /// Advance the simulation by the real time elapsed since the last tick.
    fn update(&mut self, dt: Duration);
    fn handle_input(&mut self, key: KeyEvent);
    fn handle_key_release(&mut self, _key: KeyEvent) {}
    fn handle_mouse(&mut self, _mouse: MouseEvent) {}
    fn render(&mut self, frame: &mut Frame, area: Rect);
    fn reset(&mut self);
    fn get_score(&self) -> u32;
    fn is_game_over(&self) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameId {
    Snake,
    Pong,
    Minesweeper,
    MemoryMatch,
    CatchBall,
    ColorReaction,
    Twenty48,
}

impl GameId {
    pub const ALL: [GameId; 7] = [
        GameId::Snake,
        GameId::Pong,
        GameId::Minesweeper,
        GameId::MemoryMatch,
        GameId::CatchBall,
        GameId::ColorReaction,
        GameId::Twenty48,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            GameId::Snake => "Snake",
            GameId::Pong => "Pong",
            GameId::Minesweeper => "Minesweeper",
            GameId::MemoryMatch => "Memory Match",
            GameId::CatchBall => "Catch the Ball",
            GameId::ColorReaction => "Color Reaction",
            GameId::Twenty48 => "2048 Game",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            GameId::Snake => "🐍",
            GameId::Pong => "🏓",
            GameId::Minesweeper => "💣",
            GameId::MemoryMatch => "🃏",
            GameId::CatchBall => "🧺",
            GameId::ColorReaction => "🎨",
            GameId::Twenty48 => "🔢",
        }
    }

    /// The exact (trimmed) display contents that launch this game on `=`.
    pub fn trigger(&self) -> &'static str {
        match self {
            GameId::Snake => "1+1",
            GameId::Pong => "2+2",
            GameId::Minesweeper => "3+3",
            GameId::MemoryMatch => "4+4",
            GameId::CatchBall => "5+5",
            GameId::ColorReaction => "6+6",
            GameId::Twenty48 => "2048",
        }
    }

    /// How the trigger is shown in the guidance panel.
    pub fn guidance(&self) -> &'static str {
        match self {
            GameId::Snake => "1 + 1 =",
            GameId::Pong => "2 + 2 =",
            GameId::Minesweeper => "3 + 3 =",
            GameId::MemoryMatch => "4 + 4 =",
            GameId::CatchBall => "5 + 5 =",
            GameId::ColorReaction => "6 + 6 =",
            GameId::Twenty48 => "2048 =",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            GameId::Snake => Color::Rgb(46, 204, 113),
            GameId::Pong => Color::Rgb(252, 163, 17),
            GameId::Minesweeper => Color::Rgb(190, 190, 200),
            GameId::MemoryMatch => Color::Rgb(106, 137, 204),
            GameId::CatchBall => Color::Rgb(42, 157, 143),
            GameId::ColorReaction => Color::Rgb(255, 65, 54),
            GameId::Twenty48 => Color::Rgb(237, 194, 46),
        }
    }

    pub fn from_trigger(input: &str) -> Option<GameId> {
        GameId::ALL.into_iter().find(|g| g.trigger() == input)
    }

    /// Registry factory: a freshly initialized instance of the game.
    pub fn create(self) -> Box<dyn Game> {
        match self {
            GameId::Snake => Box::new(Snake::new()),
            GameId::Pong => Box::new(Pong::new()),
            GameId::Minesweeper => Box::new(Minesweeper::new()),
            GameId::MemoryMatch => Box::new(MemoryMatch::new()),
            GameId::CatchBall => Box::new(CatchBall::new()),
            GameId::ColorReaction => Box::new(ColorReaction::new()),
            GameId::Twenty48 => Box::new(Twenty48::new()),
        }
    }
}

/// Minimum drawing area a game needs. When the host hands over a smaller
/// area, the game draws an inert notice instead of its field.
pub struct SizeGuard {
    min_width: u16,
    min_height: u16,
    warned: bool,
}

impl SizeGuard {
    pub fn new(min_width: u16, min_height: u16) -> Self {
        Self {
            min_width,
            min_height,
            warned: false,
        }
    }

    /// Returns true when `area` fits. Otherwise renders the notice, logs
    /// once per shrink, and returns false.
    pub fn check(&mut self, frame: &mut Frame, area: Rect, game: &str) -> bool {
        if area.width >= self.min_width && area.height >= self.min_height {
            self.warned = false;
            return true;
        }
        if !self.warned {
            tracing::warn!(
                game,
                width = area.width,
                height = area.height,
                need_width = self.min_width,
                need_height = self.min_height,
                "game area too small"
            );
            self.warned = true;
        }
        let msg = Paragraph::new(vec![
            Line::from(Span::styled(
                format!("{} needs a {}x{} terminal area.", game, self.min_width, self.min_height),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Enlarge the window, or press Alt+CapsLock / Esc to return.",
                Style::default().fg(Color::Gray),
            )),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        frame.render_widget(msg, area);
        false
    }
}

/// Position of a terminal cell relative to `area`, if it lies inside.
pub fn local_cell(area: Rect, column: u16, row: u16) -> Option<(u16, u16)> {
    if column >= area.x && column < area.x + area.width && row >= area.y && row < area.y + area.height {
        Some((column - area.x, row - area.y))
    } else {
        None
    }
}

pub fn is_restart_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('r') | KeyCode::Char('R'))
}

pub fn separator() -> Span<'static> {
    Span::styled(" │ ", Style::default().fg(Color::DarkGray))
}

/// Help bar built from (key, action) pairs; the first pair is highlighted.
pub fn help_line(items: &[(&str, &str)]) -> Line<'static> {
    let mut spans = vec![Span::raw(" ")];
    for (i, (key, action)) in items.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("│ ", Style::default().fg(Color::Rgb(60, 60, 60))));
        }
        let key_style = if i == 0 {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!("{} ", key), key_style));
        spans.push(Span::styled(format!("{} ", action), Style::default().fg(Color::DarkGray)));
    }
    spans.push(Span::styled("│ ", Style::default().fg(Color::Rgb(60, 60, 60))));
    spans.push(Span::styled("Alt+CapsLock Calculator", Style::default().fg(Color::DarkGray)));
    Line::from(spans)
}

/// Shared by the games' tests: draw into an off-screen terminal so click
/// regions are laid out, then build mouse events against them.
#[cfg(test)]
pub mod test_support {
    use crossterm::event::{KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::Game;

    pub fn draw(game: &mut dyn Game, width: u16, height: u16) {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.area();
                game.render(frame, area);
            })
            .unwrap();
    }

    pub fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn left_click(column: u16, row: u16) -> MouseEvent {
        mouse(MouseEventKind::Down(MouseButton::Left), column, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_trigger_maps_back_to_its_game() {
        for id in GameId::ALL {
            assert_eq!(GameId::from_trigger(id.trigger()), Some(id));
        }
        assert_eq!(GameId::from_trigger("7+7"), None);
        assert_eq!(GameId::from_trigger(" 1+1"), None);
    }

    #[test]
    fn registry_creates_fresh_instances() {
        for id in GameId::ALL {
            let game = id.create();
            assert_eq!(game.get_score(), 0, "{} should start at zero", id.title());
            assert!(!game.is_game_over());
        }
    }

    #[test]
    fn local_cell_is_relative_to_area() {
        let area = Rect::new(10, 5, 4, 3);
        assert_eq!(local_cell(area, 10, 5), Some((0, 0)));
        assert_eq!(local_cell(area, 13, 7), Some((3, 2)));
        assert_eq!(local_cell(area, 14, 7), None);
        assert_eq!(local_cell(area, 9, 5), None);
    }
}
