use std::collections::VecDeque;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::timer::Interval;
use crate::games::{help_line, is_restart_key, separator, Game, SizeGuard};

pub const GRID_SIZE: i32 = 20;
const TICK_MS: u64 = 110;
const START_LEN: i32 = 3;

const BG: Color = Color::Rgb(236, 240, 241);
const BODY: Color = Color::Rgb(46, 204, 113);
const HEAD: Color = Color::Rgb(39, 174, 96);
const FOOD: Color = Color::Rgb(231, 76, 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

pub struct Snake {
    body: VecDeque<Cell>,
    direction: Direction,
    // Only one turn is accepted per tick, so two quick presses can't fold
    // the head back into the neck.
    turned_this_tick: bool,
    food: Cell,
    score: u32,
    high_score: u32,
    game_over: bool,
    paused: bool,
    clock: Interval,
    rng: StdRng,
    size_guard: SizeGuard,
}

impl Snake {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mid = GRID_SIZE / 2;
        let body = (0..START_LEN).map(|i| Cell::new(mid - i, mid)).collect();
        let mut s = Self {
            body,
            direction: Direction::Right,
            turned_this_tick: false,
            food: Cell::new(0, 0),
            score: 0,
            high_score: 0,
            game_over: false,
            paused: false,
            clock: Interval::from_millis(TICK_MS),
            rng,
            size_guard: SizeGuard::new(GRID_SIZE as u16 * 2 + 2, GRID_SIZE as u16 + 4),
        };
        s.place_food();
        tracing::info!("snake initialized");
        s
    }

    pub fn head(&self) -> Cell {
        self.body[0]
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[cfg(test)]
    pub fn body(&self) -> impl Iterator<Item = &Cell> {
        self.body.iter()
    }

    #[cfg(test)]
    pub fn food(&self) -> Cell {
        self.food
    }

    #[cfg(test)]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn occupies(&self, cell: Cell) -> bool {
        self.body.iter().any(|c| *c == cell)
    }

    fn place_food(&mut self) {
        let free: Vec<Cell> = (0..GRID_SIZE)
            .flat_map(|y| (0..GRID_SIZE).map(move |x| Cell::new(x, y)))
            .filter(|c| !self.occupies(*c))
            .collect();
        if free.is_empty() {
            // Board full: nothing left to eat.
            self.end();
            return;
        }
        self.food = free[self.rng.gen_range(0..free.len())];
    }

    /// Request a turn. Rejected when it would reverse into the neck or when a
    /// turn was already taken this tick.
    pub fn turn(&mut self, dir: Direction) -> bool {
        if self.turned_this_tick || self.game_over {
            return false;
        }
        if dir == self.direction.opposite() || dir == self.direction {
            return false;
        }
        self.direction = dir;
        self.turned_this_tick = true;
        true
    }

    /// One tick of movement.
    pub fn step(&mut self) {
        if self.game_over {
            return;
        }
        self.turned_this_tick = false;

        let (dx, dy) = self.direction.delta();
        let head = self.head();
        let next = Cell::new(
            (head.x + dx).rem_euclid(GRID_SIZE),
            (head.y + dy).rem_euclid(GRID_SIZE),
        );
        self.body.push_front(next);

        if next == self.food {
            self.score += 1;
            self.place_food();
        } else {
            self.body.pop_back();
        }

        if self.body.iter().skip(1).any(|c| *c == next) {
            self.end();
        }
    }

    fn end(&mut self) {
        self.game_over = true;
        if self.score > self.high_score {
            self.high_score = self.score;
        }
        tracing::info!(score = self.score, length = self.body.len(), "snake game over");
    }

    #[cfg(test)]
    fn set_state(&mut self, body: &[Cell], direction: Direction, food: Cell) {
        self.body = body.iter().copied().collect();
        self.direction = direction;
        self.food = food;
    }

    fn render_field(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::with_capacity(GRID_SIZE as usize);
        for y in 0..GRID_SIZE {
            let mut spans = Vec::with_capacity(GRID_SIZE as usize);
            for x in 0..GRID_SIZE {
                let cell = Cell::new(x, y);
                let span = if cell == self.head() {
                    let eyes = match self.direction {
                        Direction::Up | Direction::Down => "▀▀",
                        Direction::Left | Direction::Right => "▐▌",
                    };
                    let fg = if self.game_over { Color::Red } else { Color::Rgb(20, 60, 30) };
                    Span::styled(eyes, Style::default().fg(fg).bg(HEAD))
                } else if self.occupies(cell) {
                    Span::styled("  ", Style::default().bg(BODY))
                } else if cell == self.food {
                    Span::styled("◖◗", Style::default().fg(FOOD).bg(BG))
                } else {
                    Span::styled("  ", Style::default().bg(BG))
                };
                spans.push(span);
            }
            lines.push(Line::from(spans));
        }
        lines
    }
}

impl Game for Snake {
    fn update(&mut self, dt: Duration) {
        if self.game_over || self.paused {
            self.clock.reset();
            return;
        }
        for _ in 0..self.clock.advance(dt) {
            self.step();
        }
    }

    fn handle_input(&mut self, key: KeyEvent) {
        if is_restart_key(&key) {
            self.reset();
            return;
        }
        if self.game_over {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                self.reset();
            }
            return;
        }
        if matches!(key.code, KeyCode::Char('p') | KeyCode::Char('P')) {
            self.paused = !self.paused;
            return;
        }
        if self.paused {
            return;
        }
        let dir = match key.code {
            KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Direction::Up,
            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Direction::Down,
            KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Direction::Left,
            KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Direction::Right,
            _ => return,
        };
        self.turn(dir);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Rgb(52, 73, 94)))
            .title(" 🐍 Snake ")
            .title_style(Style::default().fg(BODY).add_modifier(Modifier::BOLD));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if !self.size_guard.check(frame, inner, "Snake") {
            return;
        }

        let chunks = Layout::default()
            .direction(ratatui::layout::Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(GRID_SIZE as u16),
                Constraint::Length(1),
            ])
            .split(inner);

        let status = Line::from(vec![
            Span::styled(" 🐍 ", Style::default()),
            Span::styled(
                format!("Score: {} ", self.score),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            separator(),
            Span::styled(format!("Length: {} ", self.body.len()), Style::default().fg(Color::Green)),
            separator(),
            Span::styled(format!("🏆 Best: {} ", self.high_score), Style::default().fg(Color::Cyan)),
        ]);
        frame.render_widget(Paragraph::new(status), chunks[0]);

        let field = Rect {
            x: chunks[1].x + chunks[1].width.saturating_sub(GRID_SIZE as u16 * 2) / 2,
            y: chunks[1].y,
            width: (GRID_SIZE as u16 * 2).min(chunks[1].width),
            height: (GRID_SIZE as u16).min(chunks[1].height),
        };
        frame.render_widget(Paragraph::new(self.render_field()), field);

        let bar = if self.game_over {
            Line::from(vec![
                Span::styled(" 💀 GAME OVER! ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("Score: {} │ Press ENTER to restart", self.score),
                    Style::default().fg(Color::Gray),
                ),
            ])
        } else if self.paused {
            Line::from(Span::styled(
                " ⏸ PAUSED - Press P to resume ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ))
        } else {
            help_line(&[("←↑↓→/WASD", "Steer"), ("P", "Pause"), ("R", "Restart")])
        };
        frame.render_widget(Paragraph::new(bar), chunks[2]);
    }

    fn reset(&mut self) {
        let hs = self.high_score;
        let rng = self.rng.clone();
        *self = Snake::with_rng(rng);
        self.high_score = hs;
    }

    fn get_score(&self) -> u32 {
        self.score
    }

    fn is_game_over(&self) -> bool {
        self.game_over
    }
}
