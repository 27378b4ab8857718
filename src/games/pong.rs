use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::timer::Interval;
use crate::games::{help_line, is_restart_key, separator, Game, SizeGuard};

const COURT_W: f32 = 800.0;
const COURT_H: f32 = 500.0;
const PADDLE_W: f32 = 15.0;
const PADDLE_H: f32 = 100.0;
const PADDLE_SPEED: f32 = 8.0;
const BALL_RADIUS: f32 = 10.0;
const WINNING_SCORE: u32 = 5;

const BASE_SPEED_X: f32 = 6.0;
const BASE_SPEED_Y: f32 = 4.0;
// Display speed 1.0 moves the ball 5 units per frame horizontally.
const SPEED_FACTOR: f32 = 5.0 / 6.0;
const START_DISPLAY_SPEED: f32 = 1.0;
const MAX_DISPLAY_SPEED: f32 = 3.0;
const SPEED_PER_HIT: f32 = 0.1;

const FRAME_MS: u64 = 16;
// Frames a press keeps a paddle moving when no release event arrives.
const HOLD_FRAMES: u8 = 12;

const BG: Color = Color::Rgb(15, 15, 26);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    PlayerVsPlayer,
    PlayerVsBot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BotLevel {
    Easy,
    Medium,
    Hard,
}

impl BotLevel {
    fn reaction(self) -> f32 {
        match self {
            BotLevel::Easy => 0.45,
            BotLevel::Medium => 0.7,
            BotLevel::Hard => 0.95,
        }
    }

    fn accuracy_error(self) -> f32 {
        match self {
            BotLevel::Easy => 0.35,
            BotLevel::Medium => 0.15,
            BotLevel::Hard => 0.05,
        }
    }

    fn next(self) -> Self {
        match self {
            BotLevel::Easy => BotLevel::Medium,
            BotLevel::Medium => BotLevel::Hard,
            BotLevel::Hard => BotLevel::Easy,
        }
    }

    fn label(self) -> &'static str {
        match self {
            BotLevel::Easy => "Easy",
            BotLevel::Medium => "Medium",
            BotLevel::Hard => "Hard",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
    GameOver,
}

#[derive(Clone, Copy, Debug)]
struct Paddle {
    x: f32,
    y: f32,
}

impl Paddle {
    fn new(x: f32) -> Self {
        Self {
            x,
            y: COURT_H / 2.0 - PADDLE_H / 2.0,
        }
    }

    fn center(&self) -> f32 {
        self.y + PADDLE_H / 2.0
    }

    fn shift(&mut self, dy: f32) {
        self.y = (self.y + dy).clamp(0.0, COURT_H - PADDLE_H);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Ball {
    fn overlaps(&self, p: &Paddle) -> bool {
        self.x + BALL_RADIUS > p.x
            && self.x - BALL_RADIUS < p.x + PADDLE_W
            && self.y + BALL_RADIUS > p.y
            && self.y - BALL_RADIUS < p.y + PADDLE_H
    }
}

#[derive(Clone, Copy)]
enum Control {
    LeftUp,
    LeftDown,
    RightUp,
    RightDown,
}

pub struct Pong {
    left: Paddle,
    right: Paddle,
    ball: Ball,
    p1: u32,
    p2: u32,
    display_speed: f32,
    state: State,
    paused: bool,
    mode: Mode,
    bot: BotLevel,
    held: [u8; 4],
    frames: Interval,
    rng: StdRng,
    size_guard: SizeGuard,
}

impl Pong {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut pong = Self {
            left: Paddle::new(30.0),
            right: Paddle::new(COURT_W - 30.0 - PADDLE_W),
            ball: Ball {
                x: COURT_W / 2.0,
                y: COURT_H / 2.0,
                vx: 0.0,
                vy: 0.0,
            },
            p1: 0,
            p2: 0,
            display_speed: START_DISPLAY_SPEED,
            state: State::Idle,
            paused: false,
            mode: Mode::PlayerVsBot,
            bot: BotLevel::Medium,
            held: [0; 4],
            frames: Interval::from_millis(FRAME_MS),
            rng,
            size_guard: SizeGuard::new(40, 12),
        };
        pong.recenter_ball();
        pong
    }

    #[cfg(test)]
    pub fn state(&self) -> State {
        self.state
    }

    #[cfg(test)]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[cfg(test)]
    pub fn bot_level(&self) -> BotLevel {
        self.bot
    }

    #[cfg(test)]
    pub fn scores(&self) -> (u32, u32) {
        (self.p1, self.p2)
    }

    #[cfg(test)]
    pub fn display_speed(&self) -> f32 {
        self.display_speed
    }

    #[cfg(test)]
    pub fn ball(&self) -> Ball {
        self.ball
    }

    fn multiplier(&self) -> f32 {
        SPEED_FACTOR * self.display_speed
    }

    fn horizontal_speed(&self) -> f32 {
        BASE_SPEED_X * self.multiplier()
    }

    fn max_vertical_speed(&self) -> f32 {
        BASE_SPEED_Y * self.multiplier()
    }

    /// Keep a vertical speed from flattening into an endless horizontal rally.
    fn nudge(&mut self, vy: f32) -> f32 {
        let m = self.multiplier();
        if vy.abs() < 0.1 * m {
            let sign = if vy > 0.0 || (vy == 0.0 && self.rng.gen_bool(0.5)) { 1.0 } else { -1.0 };
            sign * 0.2 * BASE_SPEED_Y * m
        } else {
            vy
        }
    }

    /// Ball back to center, serving toward the player who is behind.
    fn recenter_ball(&mut self) {
        let dir = match self.p1.cmp(&self.p2) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Less => -1.0,
            std::cmp::Ordering::Equal => {
                if self.rng.gen_bool(0.5) {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        let vy = self.rng.gen_range(-1.0f32..1.0) * self.max_vertical_speed() * 0.8;
        let vy = self.nudge(vy);
        self.ball = Ball {
            x: COURT_W / 2.0,
            y: COURT_H / 2.0,
            vx: self.horizontal_speed() * dir,
            vy,
        };
    }

    fn new_match(&mut self) {
        self.p1 = 0;
        self.p2 = 0;
        self.display_speed = START_DISPLAY_SPEED;
        self.left = Paddle::new(30.0);
        self.right = Paddle::new(COURT_W - 30.0 - PADDLE_W);
        self.state = State::Idle;
        self.paused = false;
        self.held = [0; 4];
        self.frames.reset();
        self.recenter_ball();
    }

    fn serve(&mut self) {
        if self.state != State::Idle {
            return;
        }
        self.state = State::Running;
        self.recenter_ball();
        tracing::debug!(mode = ?self.mode, bot = self.bot.label(), "pong serve");
    }

    pub fn toggle_mode(&mut self) {
        if self.state == State::Running {
            return;
        }
        self.mode = match self.mode {
            Mode::PlayerVsBot => Mode::PlayerVsPlayer,
            Mode::PlayerVsPlayer => Mode::PlayerVsBot,
        };
        self.new_match();
    }

    pub fn cycle_bot(&mut self) {
        if self.state == State::Running {
            return;
        }
        self.bot = self.bot.next();
        self.new_match();
    }

    fn hold(&mut self, c: Control) {
        self.held[c as usize] = HOLD_FRAMES;
    }

    fn is_held(&self, c: Control) -> bool {
        self.held[c as usize] > 0
    }

    fn paddle_dy(&self, up: Control, down: Control) -> f32 {
        if self.is_held(up) {
            -PADDLE_SPEED
        } else if self.is_held(down) {
            PADDLE_SPEED
        } else {
            0.0
        }
    }

    fn bot_dy(&mut self) -> f32 {
        let reaction = PADDLE_SPEED * self.bot.reaction();
        let b = self.ball;
        let mut target = b.y;
        match self.bot {
            BotLevel::Easy => {
                if b.x < COURT_W * 0.4 && b.vx > 0.0 {
                    target = COURT_H / 2.0;
                }
            }
            BotLevel::Medium => {}
            BotLevel::Hard => {
                if b.vx > 0.0 {
                    let frames = ((self.right.x - BALL_RADIUS) - b.x).abs() / (b.vx.abs() + 0.1);
                    if frames > 0.0 && frames < (COURT_W / (b.vx.abs() + 0.1)) * 0.75 {
                        target = b.y + b.vy * frames * 0.8;
                    }
                }
            }
        }
        let offset = self.rng.gen_range(-1.0f32..1.0) * PADDLE_H * self.bot.accuracy_error();
        let target = (target + offset).clamp(PADDLE_H / 2.0, COURT_H - PADDLE_H / 2.0);
        let center = self.right.center();
        let dead_zone = reaction * 0.25;
        if center < target - dead_zone {
            reaction
        } else if center > target + dead_zone {
            -reaction
        } else {
            let diff = target - center;
            if diff.abs() > 1.0 {
                diff.signum() * diff.abs().min(reaction * 0.5)
            } else {
                0.0
            }
        }
    }

    fn step(&mut self) {
        let left_dy = self.paddle_dy(Control::LeftUp, Control::LeftDown);
        self.left.shift(left_dy);
        let right_dy = match self.mode {
            Mode::PlayerVsBot => self.bot_dy(),
            Mode::PlayerVsPlayer => self.paddle_dy(Control::RightUp, Control::RightDown),
        };
        self.right.shift(right_dy);
        for h in self.held.iter_mut() {
            *h = h.saturating_sub(1);
        }

        self.ball.x += self.ball.vx;
        self.ball.y += self.ball.vy;

        if self.ball.y - BALL_RADIUS < 0.0 || self.ball.y + BALL_RADIUS > COURT_H {
            self.ball.vy = -self.ball.vy;
            self.ball.y = self.ball.y.clamp(BALL_RADIUS, COURT_H - BALL_RADIUS);
        }

        let hit = if self.ball.vx < 0.0 && self.ball.overlaps(&self.left) {
            self.ball.x = self.left.x + PADDLE_W + BALL_RADIUS;
            Some(self.left)
        } else if self.ball.vx > 0.0 && self.ball.overlaps(&self.right) {
            self.ball.x = self.right.x - BALL_RADIUS;
            Some(self.right)
        } else {
            None
        };

        if let Some(paddle) = hit {
            self.display_speed = (self.display_speed + SPEED_PER_HIT).min(MAX_DISPLAY_SPEED);
            self.ball.vx = -self.ball.vx.signum() * self.horizontal_speed();
            let impact = ((self.ball.y - paddle.center()) / (PADDLE_H / 2.0)).clamp(-1.0, 1.0);
            let vy = impact * self.max_vertical_speed();
            self.ball.vy = self.nudge(vy);
        }

        if self.ball.x - BALL_RADIUS < 0.0 {
            self.p2 += 1;
            self.goal();
        } else if self.ball.x + BALL_RADIUS > COURT_W {
            self.p1 += 1;
            self.goal();
        }
    }

    fn goal(&mut self) {
        self.display_speed = START_DISPLAY_SPEED;
        if self.p1 >= WINNING_SCORE || self.p2 >= WINNING_SCORE {
            self.state = State::GameOver;
            tracing::info!(p1 = self.p1, p2 = self.p2, mode = ?self.mode, "pong match over");
        } else {
            self.recenter_ball();
        }
    }

    fn right_name(&self) -> String {
        match self.mode {
            Mode::PlayerVsBot => format!("Bot ({})", self.bot.label()),
            Mode::PlayerVsPlayer => "Player 2".to_string(),
        }
    }

    #[cfg(test)]
    fn place_ball(&mut self, x: f32, y: f32, vx: f32, vy: f32) {
        self.ball = Ball { x, y, vx, vy };
    }

    fn render_field(&self, width: usize, height: usize) -> Vec<Line<'static>> {
        let sx = width as f32 / COURT_W;
        let sy = height as f32 / COURT_H;
        let bg = Style::default().bg(BG);
        let mut grid: Vec<Vec<(char, Style)>> = vec![vec![(' ', bg); width]; height];

        let mid = width / 2;
        for (y, row) in grid.iter_mut().enumerate() {
            if y % 2 == 0 && mid < width {
                row[mid] = ('┆', bg.fg(Color::Rgb(74, 78, 105)));
            }
        }

        let paddle_style = bg.fg(Color::Rgb(224, 225, 221));
        for paddle in [&self.left, &self.right] {
            let px = ((paddle.x + PADDLE_W / 2.0) * sx) as usize;
            let top = (paddle.y * sy) as usize;
            let bottom = (((paddle.y + PADDLE_H) * sy).ceil() as usize).min(height);
            if px < width {
                for row in grid.iter_mut().take(bottom).skip(top) {
                    row[px] = ('█', paddle_style);
                }
            }
        }

        let bx = (self.ball.x * sx) as usize;
        let by = (self.ball.y * sy) as usize;
        if bx < width && by < height {
            grid[by][bx] = ('●', bg.fg(Color::Rgb(252, 163, 17)).add_modifier(Modifier::BOLD));
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

impl Game for Pong {
    fn update(&mut self, dt: Duration) {
        let steps = self.frames.advance(dt);
        if self.state != State::Running || self.paused {
            return;
        }
        for _ in 0..steps {
            self.step();
            if self.state != State::Running {
                break;
            }
        }
    }

    fn handle_input(&mut self, key: KeyEvent) {
        let control = match (key.code, self.mode) {
            (KeyCode::Char('w') | KeyCode::Char('W'), _) => Some(Control::LeftUp),
            (KeyCode::Char('s') | KeyCode::Char('S'), _) => Some(Control::LeftDown),
            (KeyCode::Up, Mode::PlayerVsPlayer) => Some(Control::RightUp),
            (KeyCode::Down, Mode::PlayerVsPlayer) => Some(Control::RightDown),
            (KeyCode::Up, Mode::PlayerVsBot) => Some(Control::LeftUp),
            (KeyCode::Down, Mode::PlayerVsBot) => Some(Control::LeftDown),
            _ => None,
        };
        if let Some(c) = control {
            self.hold(c);
            self.serve();
            return;
        }

        match key.code {
            KeyCode::Enter if self.state == State::GameOver => {
                self.new_match();
                self.serve();
            }
            KeyCode::Char('m') | KeyCode::Char('M') => self.toggle_mode(),
            KeyCode::Char('b') | KeyCode::Char('B') if self.mode == Mode::PlayerVsBot => self.cycle_bot(),
            KeyCode::Char('p') | KeyCode::Char('P') if self.state == State::Running => {
                self.paused = !self.paused;
            }
            _ if is_restart_key(&key) => self.reset(),
            _ => {}
        }
    }

    fn handle_key_release(&mut self, key: KeyEvent) {
        let released: &[Control] = match key.code {
            KeyCode::Char('w') | KeyCode::Char('W') => &[Control::LeftUp],
            KeyCode::Char('s') | KeyCode::Char('S') => &[Control::LeftDown],
            KeyCode::Up => &[Control::RightUp, Control::LeftUp],
            KeyCode::Down => &[Control::RightDown, Control::LeftDown],
            _ => &[],
        };
        for &c in released {
            self.held[c as usize] = 0;
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Rgb(74, 78, 105)))
            .title(" 🏓 Pong ")
            .title_style(Style::default().fg(Color::Rgb(252, 163, 17)).add_modifier(Modifier::BOLD));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if !self.size_guard.check(frame, inner, "Pong") {
            return;
        }

        let chunks = Layout::default()
            .direction(ratatui::layout::Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(8), Constraint::Length(1)])
            .split(inner);

        let mode = match self.mode {
            Mode::PlayerVsBot => format!("vs Bot ({})", self.bot.label()),
            Mode::PlayerVsPlayer => "vs Player".to_string(),
        };
        let mut status = vec![
            Span::styled(
                format!(" Player 1: {} - {}: {} ", self.p1, self.right_name(), self.p2),
                Style::default().fg(Color::Rgb(252, 163, 17)).add_modifier(Modifier::BOLD),
            ),
            separator(),
            Span::styled(
                format!("Speed: {:.1} ", self.display_speed),
                Style::default().fg(Color::Rgb(195, 195, 230)),
            ),
            separator(),
            Span::styled(mode, Style::default().fg(Color::Cyan)),
        ];
        if self.paused {
            status.push(separator());
            status.push(Span::styled("PAUSED", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
        }
        frame.render_widget(Paragraph::new(Line::from(status)), chunks[0]);

        let field = chunks[1];
        let lines = self.render_field(field.width as usize, field.height as usize);
        frame.render_widget(Paragraph::new(lines), field);

        let bar = match self.state {
            State::Idle => Line::from(vec![
                Span::styled(" Press W, S, ↑ or ↓ to serve ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                Span::styled("│ M Mode │ B Bot level", Style::default().fg(Color::DarkGray)),
            ]),
            State::GameOver => {
                let winner = if self.p1 >= WINNING_SCORE {
                    "Player 1".to_string()
                } else {
                    self.right_name()
                };
                Line::from(vec![
                    Span::styled(
                        format!(" {} Wins! ", winner),
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled("Press ENTER to restart │ M Mode │ B Bot level", Style::default().fg(Color::Gray)),
                ])
            }
            State::Running => match self.mode {
                Mode::PlayerVsBot => help_line(&[("W/S ↑/↓", "Move"), ("P", "Pause"), ("R", "Reset")]),
                Mode::PlayerVsPlayer => help_line(&[("W/S", "P1"), ("↑/↓", "P2"), ("P", "Pause"), ("R", "Reset")]),
            },
        };
        frame.render_widget(Paragraph::new(bar), chunks[2]);
    }

    fn reset(&mut self) {
        self.new_match();
    }

    fn get_score(&self) -> u32 {
        self.p1
    }

    fn is_game_over(&self) -> bool {
        self.state == State::GameOver
    }
}
