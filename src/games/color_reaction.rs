use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::timer::{ms, Delay};
use crate::games::{help_line, is_restart_key, local_cell, separator, Game, SizeGuard};

pub const COLORS: [(&str, Color); 6] = [
    ("RED", Color::Rgb(0xFF, 0x41, 0x36)),
    ("GREEN", Color::Rgb(0x2E, 0xCC, 0x40)),
    ("BLUE", Color::Rgb(0x00, 0x74, 0xD9)),
    ("YELLOW", Color::Rgb(0xFF, 0xDC, 0x00)),
    ("PURPLE", Color::Rgb(0xB1, 0x0D, 0xC9)),
    ("ORANGE", Color::Rgb(0xFF, 0x85, 0x1B)),
];

const START_BASE_MS: u64 = 2000;
const MIN_BASE_MS: u64 = 600;
const BASE_STEP_MS: u64 = 50;
const FEEDBACK_MS: u64 = 1200;
const LIVES: u32 = 3;
const POINTS: u32 = 10;

const BOX_W: u16 = 24;
const BOX_H: u16 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Non-target color shown, clicks ignored.
    Waiting,
    /// Showing decoys; `left` more follow before the target.
    Cycling { left: u8 },
    /// Target shown; the only window in which a click is correct.
    Settled,
    /// Feedback from the last reaction.
    Resolved,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    Correct,
    Wrong,
    Missed,
}

impl Feedback {
    fn text(self) -> &'static str {
        match self {
            Feedback::Correct => "Correct!",
            Feedback::Wrong => "Wrong!",
            Feedback::Missed => "Missed!",
        }
    }
}

pub struct ColorReaction {
    target: usize,
    shown: usize,
    phase: Phase,
    timer: Delay,
    base_ms: u64,
    score: u32,
    high_score: u32,
    lives: u32,
    feedback: Option<Feedback>,
    box_area: Rect,
    rng: StdRng,
    size_guard: SizeGuard,
}

impl ColorReaction {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut game = Self {
            target: 0,
            shown: 1,
            phase: Phase::Waiting,
            timer: Delay::default(),
            base_ms: START_BASE_MS,
            score: 0,
            high_score: 0,
            lives: LIVES,
            feedback: None,
            box_area: Rect::default(),
            rng,
            size_guard: SizeGuard::new(BOX_W + 2, BOX_H + 6),
        };
        game.next_round();
        game
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[cfg(test)]
    pub fn target_name(&self) -> &'static str {
        COLORS[self.target].0
    }

    #[cfg(test)]
    pub fn shown_name(&self) -> &'static str {
        COLORS[self.shown].0
    }

    #[cfg(test)]
    pub fn lives(&self) -> u32 {
        self.lives
    }

    #[cfg(test)]
    pub fn base(&self) -> Duration {
        ms(self.base_ms)
    }

    #[cfg(test)]
    pub fn feedback(&self) -> Option<Feedback> {
        self.feedback
    }

    /// A color index other than the target and the one on screen.
    fn decoy(&mut self) -> usize {
        loop {
            let i = self.rng.gen_range(0..COLORS.len());
            if i != self.target && i != self.shown {
                return i;
            }
        }
    }

    fn next_round(&mut self) {
        self.feedback = None;
        self.target = self.rng.gen_range(0..COLORS.len());
        self.shown = self.decoy();
        self.phase = Phase::Waiting;
        self.timer.start(ms(self.rng.gen_range(700..=1200)));
    }

    fn cycle_delay(&mut self) -> Duration {
        let factor = self.rng.gen_range(0.5..0.9);
        Duration::from_secs_f64(self.base_ms as f64 * factor / 1000.0)
    }

    fn show_decoy(&mut self, left: u8) {
        self.shown = self.decoy();
        self.phase = Phase::Cycling { left };
        let delay = self.cycle_delay();
        self.timer.start(delay);
    }

    /// Drive the round forward by `dt`. A click must be applied before the
    /// tick that carries it, so it is judged against the color on screen.
    /// Time past a phase deadline carries into the next phase.
    pub fn advance(&mut self, dt: Duration) {
        let mut dt = dt;
        while let Some(overshoot) = self.timer.advance(dt) {
            self.on_deadline();
            dt = overshoot;
        }
    }

    fn on_deadline(&mut self) {
        match self.phase {
            Phase::Waiting => {
                let decoys = self.rng.gen_range(1..=3u8);
                self.show_decoy(decoys - 1);
            }
            Phase::Cycling { left } if left > 0 => self.show_decoy(left - 1),
            Phase::Cycling { .. } => {
                self.shown = self.target;
                self.phase = Phase::Settled;
                self.timer.start(ms(self.base_ms));
            }
            Phase::Settled => self.resolve(Feedback::Missed),
            Phase::Resolved => self.next_round(),
            Phase::GameOver => {}
        }
    }

    /// React to the box. Ignored while waiting, resolving or after the game.
    pub fn click(&mut self) {
        match self.phase {
            Phase::Cycling { .. } => self.resolve(Feedback::Wrong),
            Phase::Settled => self.resolve(Feedback::Correct),
            Phase::Waiting | Phase::Resolved | Phase::GameOver => {}
        }
    }

    fn resolve(&mut self, feedback: Feedback) {
        self.timer.cancel();
        self.feedback = Some(feedback);
        if feedback == Feedback::Correct {
            self.score += POINTS;
            self.high_score = self.high_score.max(self.score);
            if self.base_ms > MIN_BASE_MS {
                self.base_ms = (self.base_ms - BASE_STEP_MS).max(MIN_BASE_MS);
            }
        } else {
            self.lives = self.lives.saturating_sub(1);
            if self.lives == 0 {
                self.phase = Phase::GameOver;
                tracing::info!(score = self.score, "color reaction over");
                return;
            }
        }
        tracing::debug!(?feedback, base_ms = self.base_ms, "color reaction resolved");
        self.phase = Phase::Resolved;
        self.timer.start(ms(FEEDBACK_MS));
    }
}

impl Game for ColorReaction {
    fn update(&mut self, dt: Duration) {
        self.advance(dt);
    }

    fn handle_input(&mut self, key: KeyEvent) {
        match key.code {
            _ if is_restart_key(&key) => self.reset(),
            KeyCode::Enter if self.phase == Phase::GameOver => self.reset(),
            KeyCode::Char(' ') | KeyCode::Enter => self.click(),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
            if local_cell(self.box_area, mouse.column, mouse.row).is_some() {
                self.click();
            }
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Rgb(80, 80, 100)))
            .title(" 🎨 Color Reaction ")
            .title_style(Style::default().fg(Color::Rgb(255, 133, 27)).add_modifier(Modifier::BOLD));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if !self.size_guard.check(frame, inner, "Color Reaction") {
            self.box_area = Rect::default();
            return;
        }

        let chunks = Layout::default()
            .direction(ratatui::layout::Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(2),
                Constraint::Min(BOX_H),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        let hearts: String = (0..LIVES).map(|i| if i < self.lives { '♥' } else { '♡' }).collect();
        let status = Line::from(vec![
            Span::styled(
                format!(" Score: {} ", self.score),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            separator(),
            Span::styled(format!("Lives: {} ", hearts), Style::default().fg(Color::Red)),
            separator(),
            Span::styled(format!("Best: {} ", self.high_score), Style::default().fg(Color::Yellow)),
            separator(),
            Span::styled(format!("Window: {} ms", self.base_ms), Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(status), chunks[0]);

        let (name, color) = COLORS[self.target];
        let instruction = Paragraph::new(Line::from(vec![
            Span::styled("Click on ", Style::default().fg(Color::Gray)),
            Span::styled(name, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(instruction, chunks[1]);

        let field = chunks[2];
        self.box_area = Rect {
            x: field.x + field.width.saturating_sub(BOX_W) / 2,
            y: field.y + field.height.saturating_sub(BOX_H) / 2,
            width: BOX_W.min(field.width),
            height: BOX_H.min(field.height),
        };
        let fill = if self.phase == Phase::GameOver {
            Color::Rgb(40, 40, 40)
        } else {
            COLORS[self.shown].1
        };
        frame.render_widget(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Thick)
                .border_style(Style::default().fg(Color::Rgb(200, 200, 200)))
                .style(Style::default().bg(fill)),
            self.box_area,
        );

        let feedback = match (self.phase, self.feedback) {
            (Phase::GameOver, _) => Line::from(vec![
                Span::styled("GAME OVER ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("Final score: {} │ Press ENTER to play again", self.score),
                    Style::default().fg(Color::Gray),
                ),
            ]),
            (_, Some(fb)) => {
                let color = if fb == Feedback::Correct { Color::Green } else { Color::Red };
                Line::from(Span::styled(fb.text(), Style::default().fg(color).add_modifier(Modifier::BOLD)))
            }
            (Phase::Waiting, None) => Line::from(Span::styled("Get ready...", Style::default().fg(Color::DarkGray))),
            _ => Line::from(""),
        };
        frame.render_widget(Paragraph::new(feedback).alignment(Alignment::Center), chunks[3]);

        let bar = help_line(&[("Click/Space", "React"), ("R", "Restart")]);
        frame.render_widget(Paragraph::new(bar), chunks[4]);
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
        self.phase == Phase::GameOver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::test_support::{draw, left_click, mouse};

    const STEP: Duration = Duration::from_millis(10);

    /// Tick until `pred` holds, panicking after a generous time bound.
    fn run_until(g: &mut ColorReaction, pred: impl Fn(&ColorReaction) -> bool) {
        for _ in 0..2_000 {
            if pred(g) {
                return;
            }
            g.advance(STEP);
        }
        panic!("phase never reached, stuck in {:?}", g.phase());
    }

    fn settled(g: &mut ColorReaction) {
        run_until(g, |g| g.phase() == Phase::Settled);
    }

    #[test]
    fn round_waits_cycles_then_settles_on_the_target() {
        let mut g = ColorReaction::with_seed(1);
        assert_eq!(g.phase(), Phase::Waiting);
        assert_ne!(g.shown_name(), g.target_name());
        run_until(&mut g, |g| matches!(g.phase(), Phase::Cycling { .. }));
        while let Phase::Cycling { .. } = g.phase() {
            assert_ne!(g.shown_name(), g.target_name());
            g.advance(STEP);
        }
        assert_eq!(g.phase(), Phase::Settled);
        assert_eq!(g.shown_name(), g.target_name());
    }

    #[test]
    fn clicks_while_waiting_are_ignored() {
        let mut g = ColorReaction::with_seed(2);
        g.click();
        assert_eq!(g.phase(), Phase::Waiting);
        assert_eq!(g.lives(), 3);
        assert_eq!(g.get_score(), 0);
    }

    #[test]
    fn click_on_the_target_scores_and_speeds_up() {
        let mut g = ColorReaction::with_seed(3);
        settled(&mut g);
        g.click();
        assert_eq!(g.feedback(), Some(Feedback::Correct));
        assert_eq!(g.get_score(), 10);
        assert_eq!(g.base(), ms(1950));
        assert_eq!(g.phase(), Phase::Resolved);
        g.advance(ms(FEEDBACK_MS));
        assert_eq!(g.phase(), Phase::Waiting);
        assert_eq!(g.feedback(), None);
    }

    #[test]
    fn click_on_a_decoy_costs_a_life() {
        let mut g = ColorReaction::with_seed(4);
        run_until(&mut g, |g| matches!(g.phase(), Phase::Cycling { .. }));
        g.click();
        assert_eq!(g.feedback(), Some(Feedback::Wrong));
        assert_eq!(g.lives(), 2);
        assert_eq!(g.base(), ms(START_BASE_MS));
    }

    #[test]
    fn letting_the_window_expire_is_a_miss() {
        let mut g = ColorReaction::with_seed(5);
        settled(&mut g);
        g.advance(ms(START_BASE_MS));
        assert_eq!(g.feedback(), Some(Feedback::Missed));
        assert_eq!(g.lives(), 2);
    }

    #[test]
    fn click_lands_before_the_same_tick_expires_the_window() {
        let mut g = ColorReaction::with_seed(6);
        settled(&mut g);
        // Input is applied first, then the tick that would have ended the window.
        g.click();
        g.advance(ms(START_BASE_MS));
        assert_eq!(g.get_score(), 10);
        assert_eq!(g.lives(), 3);
    }

    #[test]
    fn late_ticks_do_not_stretch_the_next_phase() {
        let mut g = ColorReaction::with_seed(9);
        settled(&mut g);
        g.click();
        g.advance(ms(FEEDBACK_MS) + ms(300));
        assert_eq!(g.phase(), Phase::Waiting);
        // 300 ms of the wait are already spent; the longest wait is 1200 ms.
        g.advance(ms(900));
        assert!(matches!(g.phase(), Phase::Cycling { .. }));
    }

    #[test]
    fn only_left_clicks_on_the_box_count() {
        let mut g = ColorReaction::with_seed(10);
        settled(&mut g);
        draw(&mut g, 60, 24);
        let target = g.box_area;
        assert!(target.width > 0 && target.height > 0);

        g.handle_mouse(left_click(target.x.saturating_sub(1), target.y));
        g.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Right), target.x, target.y));
        assert_eq!(g.phase(), Phase::Settled);

        g.handle_mouse(left_click(target.x + target.width / 2, target.y + target.height / 2));
        assert_eq!(g.feedback(), Some(Feedback::Correct));
        assert_eq!(g.get_score(), 10);
    }

    #[test]
    fn three_misses_end_the_game() {
        let mut g = ColorReaction::with_seed(7);
        for _ in 0..3 {
            settled(&mut g);
            g.advance(ms(START_BASE_MS));
            if g.phase() == Phase::Resolved {
                g.advance(ms(FEEDBACK_MS));
            }
        }
        assert!(g.is_game_over());
        g.click();
        g.advance(Duration::from_secs(10));
        assert_eq!(g.phase(), Phase::GameOver);

        g.handle_input(KeyEvent::new(KeyCode::Enter, crossterm::event::KeyModifiers::NONE));
        assert_eq!(g.phase(), Phase::Waiting);
        assert_eq!(g.lives(), 3);
    }

    #[test]
    fn window_shrinks_to_a_floor() {
        let mut g = ColorReaction::with_seed(8);
        for _ in 0..40 {
            settled(&mut g);
            g.click();
            g.advance(ms(FEEDBACK_MS));
        }
        assert_eq!(g.base(), ms(MIN_BASE_MS));
        assert_eq!(g.get_score(), 400);
    }
}
