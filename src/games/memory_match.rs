use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::timer::{ms, Delay};
use crate::games::{help_line, is_restart_key, local_cell, separator, Game, SizeGuard};

const SYMBOLS: [&str; 8] = ["🍕", "🎈", "🌟", "🎉", "🎁", "🚀", "🦄", "💡"];
const COLS: usize = 4;
const FLIP_BACK_MS: u64 = 900;

const CARD_W: u16 = 8;
const CARD_H: u16 = 3;
const GAP: u16 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Card {
    pub symbol: &'static str,
    pub is_flipped: bool,
    pub is_matched: bool,
}

pub struct MemoryMatch {
    cards: Vec<Card>,
    // Indices of the face-up, unmatched cards of the current turn.
    flipped: Vec<usize>,
    matched_pairs: usize,
    moves: u32,
    locked: bool,
    flip_back: Delay,
    cursor: usize,
    board_area: Rect,
    best_moves: Option<u32>,
    rng: StdRng,
    size_guard: SizeGuard,
}

impl MemoryMatch {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut rng: StdRng) -> Self {
        let mut symbols: Vec<&'static str> = SYMBOLS.iter().chain(SYMBOLS.iter()).copied().collect();
        symbols.shuffle(&mut rng);
        let cards = symbols
            .into_iter()
            .map(|symbol| Card {
                symbol,
                is_flipped: false,
                is_matched: false,
            })
            .collect();
        Self {
            cards,
            flipped: Vec::with_capacity(2),
            matched_pairs: 0,
            moves: 0,
            locked: false,
            flip_back: Delay::default(),
            cursor: 0,
            board_area: Rect::default(),
            best_moves: None,
            rng,
            size_guard: SizeGuard::new(COLS as u16 * (CARD_W + GAP) + 2, 4 * (CARD_H + GAP) + 2),
        }
    }

    #[cfg(test)]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[cfg(test)]
    pub fn moves(&self) -> u32 {
        self.moves
    }

    #[cfg(test)]
    pub fn matched_pairs(&self) -> usize {
        self.matched_pairs
    }

    pub fn total_pairs(&self) -> usize {
        self.cards.len() / 2
    }

    #[cfg(test)]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_won(&self) -> bool {
        self.matched_pairs == self.total_pairs()
    }

    /// Flip card `i` if the board accepts it. Returns whether it flipped.
    pub fn flip(&mut self, i: usize) -> bool {
        if self.locked || i >= self.cards.len() {
            return false;
        }
        let card = self.cards[i];
        if card.is_flipped || card.is_matched {
            return false;
        }
        self.cards[i].is_flipped = true;
        self.flipped.push(i);
        if self.flipped.len() == 2 {
            self.moves += 1;
            self.locked = true;
            self.check_for_match();
        }
        true
    }

    fn check_for_match(&mut self) {
        let (a, b) = (self.flipped[0], self.flipped[1]);
        if self.cards[a].symbol == self.cards[b].symbol {
            self.cards[a].is_matched = true;
            self.cards[b].is_matched = true;
            self.matched_pairs += 1;
            self.flipped.clear();
            if self.is_won() {
                // The board stays locked until a reset.
                self.best_moves = Some(self.best_moves.map_or(self.moves, |b| b.min(self.moves)));
                tracing::info!(moves = self.moves, "memory match cleared");
            } else {
                self.locked = false;
            }
        } else {
            self.flip_back.start(ms(FLIP_BACK_MS));
        }
    }

    fn resolve_mismatch(&mut self) {
        for i in self.flipped.drain(..) {
            self.cards[i].is_flipped = false;
        }
        self.locked = false;
    }

    fn card_at(&self, column: u16, row: u16) -> Option<usize> {
        let (x, y) = local_cell(self.board_area, column, row)?;
        let (c, r) = ((x / (CARD_W + GAP)) as usize, (y / (CARD_H + GAP)) as usize);
        let in_gap = x % (CARD_W + GAP) >= CARD_W || y % (CARD_H + GAP) >= CARD_H;
        let i = r * COLS + c;
        (!in_gap && c < COLS && i < self.cards.len()).then_some(i)
    }

    fn move_cursor(&mut self, dr: isize, dc: isize) {
        let rows = (self.cards.len() / COLS) as isize;
        let r = (self.cursor / COLS) as isize + dr;
        let c = (self.cursor % COLS) as isize + dc;
        self.cursor = (r.clamp(0, rows - 1) * COLS as isize + c.clamp(0, COLS as isize - 1)) as usize;
    }

    fn card_widget(&self, i: usize) -> Paragraph<'static> {
        let card = self.cards[i];
        let selected = i == self.cursor && !self.is_won();
        let (face, bg, fg) = if card.is_matched {
            (card.symbol, Color::Rgb(60, 140, 90), Color::White)
        } else if card.is_flipped {
            (card.symbol, Color::Rgb(235, 235, 245), Color::Black)
        } else {
            ("?", Color::Rgb(106, 137, 204), Color::Rgb(220, 230, 255))
        };
        let border = if selected { Color::Yellow } else { bg };
        Paragraph::new(Line::from(Span::styled(
            face,
            Style::default().fg(fg).add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .style(Style::default().bg(bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border).bg(bg)),
        )
    }
}

impl Game for MemoryMatch {
    fn update(&mut self, dt: Duration) {
        if self.flip_back.advance(dt).is_some() {
            self.resolve_mismatch();
        }
    }

    fn handle_input(&mut self, key: KeyEvent) {
        match key.code {
            _ if is_restart_key(&key) => self.reset(),
            KeyCode::Enter if self.is_won() => self.reset(),
            KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => self.move_cursor(-1, 0),
            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => self.move_cursor(1, 0),
            KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => self.move_cursor(0, -1),
            KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => self.move_cursor(0, 1),
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.flip(self.cursor);
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
            if let Some(i) = self.card_at(mouse.column, mouse.row) {
                self.cursor = i;
                self.flip(i);
            }
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Rgb(106, 137, 204)))
            .title(" 🃏 Memory Match ")
            .title_style(Style::default().fg(Color::Rgb(160, 185, 240)).add_modifier(Modifier::BOLD));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if !self.size_guard.check(frame, inner, "Memory Match") {
            self.board_area = Rect::default();
            return;
        }

        let chunks = Layout::default()
            .direction(ratatui::layout::Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1), Constraint::Length(1)])
            .split(inner);

        let mut status = vec![
            Span::styled(
                format!(" Moves: {} ", self.moves),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            separator(),
            Span::styled(
                format!("Matches: {}/{} ", self.matched_pairs, self.total_pairs()),
                Style::default().fg(Color::Green),
            ),
        ];
        if let Some(best) = self.best_moves {
            status.push(separator());
            status.push(Span::styled(format!("Best: {} moves", best), Style::default().fg(Color::Yellow)));
        }
        frame.render_widget(Paragraph::new(Line::from(status)), chunks[0]);

        let rows = (self.cards.len() / COLS) as u16;
        let w = COLS as u16 * (CARD_W + GAP) - GAP;
        let h = rows * (CARD_H + GAP) - GAP;
        let field = chunks[1];
        self.board_area = Rect {
            x: field.x + field.width.saturating_sub(w) / 2,
            y: field.y + field.height.saturating_sub(h) / 2,
            width: w.min(field.width),
            height: h.min(field.height),
        };
        for i in 0..self.cards.len() {
            let (r, c) = ((i / COLS) as u16, (i % COLS) as u16);
            let cell = Rect {
                x: self.board_area.x + c * (CARD_W + GAP),
                y: self.board_area.y + r * (CARD_H + GAP),
                width: CARD_W,
                height: CARD_H,
            };
            if cell.bottom() <= field.bottom() && cell.right() <= field.right() {
                frame.render_widget(self.card_widget(i), cell);
            }
        }

        let bar = if self.is_won() {
            Line::from(vec![
                Span::styled(
                    " 🎉 Congratulations! ",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("All pairs found in {} moves │ Press ENTER to play again", self.moves),
                    Style::default().fg(Color::Gray),
                ),
            ])
        } else {
            help_line(&[("Click/Space", "Flip"), ("Arrows", "Select"), ("R", "Reset")])
        };
        frame.render_widget(Paragraph::new(bar), chunks[2]);
    }

    fn reset(&mut self) {
        let best = self.best_moves;
        let rng = self.rng.clone();
        // Replacing the state drops the pending flip-back with it.
        *self = Self::with_rng(rng);
        self.best_moves = best;
    }

    fn get_score(&self) -> u32 {
        self.matched_pairs as u32
    }

    fn is_game_over(&self) -> bool {
        self.is_won()
    }
}
