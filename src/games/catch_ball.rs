use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::timer::{ms, Interval};
use crate::games::{help_line, is_restart_key, local_cell, separator, Game, SizeGuard};

const FIELD_W: f32 = 600.0;
const FIELD_H: f32 = 400.0;
const CATCHER_W: f32 = 80.0;
const CATCHER_H: f32 = 15.0;
const CATCHER_Y: f32 = FIELD_H - CATCHER_H - 10.0;
const CATCHER_NUDGE: f32 = 15.0;
const BALL_RADIUS: f32 = 8.0;
const MIN_SPEED: f32 = 1.5;
const MAX_SPEED: f32 = 3.5;
const START_SPAWN_MS: u64 = 1200;
const SPAWN_STEP_MS: u64 = 20;
const MIN_SPAWN_MS: u64 = 400;
const FRAME_MS: u64 = 16;
const LIVES: u32 = 3;
const CATCH_POINTS: u32 = 10;

const BALL_COLORS: [Color; 4] = [
    Color::Rgb(231, 111, 81),
    Color::Rgb(244, 162, 97),
    Color::Rgb(233, 196, 106),
    Color::Rgb(38, 70, 83),
];
const BG: Color = Color::Rgb(18, 24, 30);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FallingBall {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    color: Color,
}

pub struct CatchBall {
    catcher_x: f32,
    balls: Vec<FallingBall>,
    score: u32,
    high_score: u32,
    lives: u32,
    game_over: bool,
    paused: bool,
    frames: Interval,
    spawn: Interval,
    field_area: Rect,
    rng: StdRng,
    size_guard: SizeGuard,
}

impl CatchBall {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            catcher_x: (FIELD_W - CATCHER_W) / 2.0,
            balls: Vec::new(),
            score: 0,
            high_score: 0,
            lives: LIVES,
            game_over: false,
            paused: false,
            frames: Interval::from_millis(FRAME_MS),
            spawn: Interval::from_millis(START_SPAWN_MS),
            field_area: Rect::default(),
            rng,
            size_guard: SizeGuard::new(30, 12),
        }
    }

    #[cfg(test)]
    pub fn catcher_x(&self) -> f32 {
        self.catcher_x
    }

    #[cfg(test)]
    pub fn balls(&self) -> &[FallingBall] {
        &self.balls
    }

    #[cfg(test)]
    pub fn lives(&self) -> u32 {
        self.lives
    }

    #[cfg(test)]
    pub fn spawn_interval(&self) -> Duration {
        self.spawn.period()
    }

    /// Center the catcher on logical x, keeping it inside the field.
    pub fn move_catcher_to(&mut self, x: f32) {
        self.catcher_x = (x - CATCHER_W / 2.0).clamp(0.0, FIELD_W - CATCHER_W);
    }

    fn nudge(&mut self, dx: f32) {
        self.catcher_x = (self.catcher_x + dx).clamp(0.0, FIELD_W - CATCHER_W);
    }

    fn spawn_ball(&mut self) {
        let x = self.rng.gen_range(BALL_RADIUS..FIELD_W - BALL_RADIUS);
        let speed = self.rng.gen_range(MIN_SPEED..MAX_SPEED);
        let color = BALL_COLORS[self.rng.gen_range(0..BALL_COLORS.len())];
        self.balls.push(FallingBall {
            x,
            y: -BALL_RADIUS,
            speed,
            color,
        });
        let period = self.spawn.period();
        if period > ms(MIN_SPAWN_MS) {
            self.spawn.set_period((period - ms(SPAWN_STEP_MS)).max(ms(MIN_SPAWN_MS)));
        }
    }

    fn step(&mut self) {
        let catcher_x = self.catcher_x;
        let mut caught = 0;
        let mut missed = 0;
        self.balls.retain_mut(|b| {
            b.y += b.speed;
            let in_band = b.y + BALL_RADIUS > CATCHER_Y && b.y - BALL_RADIUS < CATCHER_Y + CATCHER_H;
            let in_width = b.x > catcher_x && b.x < catcher_x + CATCHER_W;
            if in_band && in_width {
                caught += 1;
                false
            } else if b.y - BALL_RADIUS > FIELD_H {
                missed += 1;
                false
            } else {
                true
            }
        });
        self.score += caught * CATCH_POINTS;
        self.high_score = self.high_score.max(self.score);
        self.lives = self.lives.saturating_sub(missed);
        if self.lives == 0 {
            self.game_over = true;
            tracing::info!(score = self.score, "catch the ball over");
        }
    }

    fn field_x(&self, column: u16) -> Option<f32> {
        let (x, _) = local_cell(self.field_area, column, self.field_area.y)?;
        Some((x as f32 + 0.5) * FIELD_W / self.field_area.width as f32)
    }

    #[cfg(test)]
    fn drop_ball(&mut self, x: f32, y: f32, speed: f32) {
        self.balls.push(FallingBall {
            x,
            y,
            speed,
            color: BALL_COLORS[0],
        });
    }

    fn render_field(&self, width: usize, height: usize) -> Vec<Line<'static>> {
        let sx = width as f32 / FIELD_W;
        let sy = height as f32 / FIELD_H;
        let bg = Style::default().bg(BG);
        let mut grid: Vec<Vec<(char, Style)>> = vec![vec![(' ', bg); width]; height];

        for b in &self.balls {
            if b.y < 0.0 {
                continue;
            }
            let (x, y) = ((b.x * sx) as usize, (b.y * sy) as usize);
            if x < width && y < height {
                grid[y][x] = ('●', bg.fg(b.color).add_modifier(Modifier::BOLD));
            }
        }

        let cy = ((CATCHER_Y * sy) as usize).min(height.saturating_sub(1));
        let start = (self.catcher_x * sx) as usize;
        let end = (((self.catcher_x + CATCHER_W) * sx) as usize).min(width);
        if let Some(row) = grid.get_mut(cy) {
            for cell in row.iter_mut().take(end).skip(start) {
                *cell = ('▀', bg.fg(Color::Rgb(42, 157, 143)));
            }
        }

        grid.into_iter()
            .map(|row| {
                Line::from(
                    row.into_iter()
                        .map(|(ch, style)| Span::styled(String::from(ch), style))
                        .collect::<Vec<_>>(),
                )
            })
            .collect()
    }
}

impl Game for CatchBall {
    fn update(&mut self, dt: Duration) {
        if self.game_over || self.paused {
            return;
        }
        for _ in 0..self.frames.advance(dt) {
            self.step();
            if self.game_over {
                return;
            }
        }
        for _ in 0..self.spawn.advance(dt) {
            self.spawn_ball();
        }
    }

    fn handle_input(&mut self, key: KeyEvent) {
        match key.code {
            _ if is_restart_key(&key) => self.reset(),
            KeyCode::Enter if self.game_over => self.reset(),
            KeyCode::Char('p') | KeyCode::Char('P') if !self.game_over => self.paused = !self.paused,
            KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') if !self.paused => self.nudge(-CATCHER_NUDGE),
            KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') if !self.paused => self.nudge(CATCHER_NUDGE),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.game_over || self.paused {
            return;
        }
        if let MouseEventKind::Moved | MouseEventKind::Drag(_) | MouseEventKind::Down(_) = mouse.kind {
            if mouse.row >= self.field_area.y && mouse.row < self.field_area.bottom() {
                if let Some(x) = self.field_x(mouse.column) {
                    self.move_catcher_to(x);
                }
            }
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Rgb(42, 157, 143)))
            .title(" 🧺 Catch the Ball ")
            .title_style(Style::default().fg(Color::Rgb(233, 196, 106)).add_modifier(Modifier::BOLD));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if !self.size_guard.check(frame, inner, "Catch the Ball") {
            self.field_area = Rect::default();
            return;
        }

        let chunks = Layout::default()
            .direction(ratatui::layout::Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(8), Constraint::Length(1)])
            .split(inner);

        let hearts: String = (0..LIVES).map(|i| if i < self.lives { '♥' } else { '♡' }).collect();
        let mut status = vec![
            Span::styled(
                format!(" Score: {} ", self.score),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            separator(),
            Span::styled(format!("Lives: {} ", hearts), Style::default().fg(Color::Red)),
            separator(),
            Span::styled(format!("Best: {} ", self.high_score), Style::default().fg(Color::Yellow)),
        ];
        if self.paused {
            status.push(separator());
            status.push(Span::styled("PAUSED", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
        }
        frame.render_widget(Paragraph::new(Line::from(status)), chunks[0]);

        self.field_area = chunks[1];
        let lines = self.render_field(chunks[1].width as usize, chunks[1].height as usize);
        frame.render_widget(Paragraph::new(lines), chunks[1]);

        if self.game_over {
            let popup = centered_rect(32, 5, chunks[1]);
            frame.render_widget(Clear, popup);
            let text = Paragraph::new(vec![
                Line::from(Span::styled(
                    "GAME OVER",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(format!("Final score: {}", self.score)),
                Line::from(Span::styled("Press ENTER to play again", Style::default().fg(Color::Gray))),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded));
            frame.render_widget(text, popup);
        }

        let bar = help_line(&[("Mouse/←→", "Move"), ("P", "Pause"), ("R", "Restart")]);
        frame.render_widget(Paragraph::new(bar), chunks[2]);
    }

    fn reset(&mut self) {
        let high = self.high_score;
        let rng = self.rng.clone();
        *self = Self::with_rng(rng);
        self.high_score = high;
    }

    fn get_score(&self) -> u32 {
        self.score
    }

    fn is_game_over(&self) -> bool {
        self.game_over
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}
