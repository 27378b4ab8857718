use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::{help_line, is_restart_key, separator, Game, SizeGuard};

pub const SIZE: usize = 4;
pub const WIN_TILE: u32 = 2048;
const CELL_W: u16 = 8;
const CELL_H: u16 = 3;

pub type Board = [[u32; SIZE]; SIZE];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum Highlight {
    #[default]
    None,
    Spawned,
    Merged,
}

/// Slide one line toward index 0: compact, merge equal neighbours pairwise
/// (a tile merges at most once), pad with zeros. Returns the new line, the
/// points gained and which slots hold a merged tile.
pub fn slide_line(line: [u32; SIZE]) -> ([u32; SIZE], u32, [bool; SIZE]) {
    let tiles: Vec<u32> = line.iter().copied().filter(|v| *v != 0).collect();
    let mut out = [0; SIZE];
    let mut merged = [false; SIZE];
    let mut points = 0;
    let mut slot = 0;
    let mut i = 0;
    while i < tiles.len() {
        if i + 1 < tiles.len() && tiles[i] == tiles[i + 1] {
            let v = tiles[i] * 2;
            out[slot] = v;
            merged[slot] = true;
            points += v;
            i += 2;
        } else {
            out[slot] = tiles[i];
            i += 1;
        }
        slot += 1;
    }
    (out, points, merged)
}

pub struct MoveOutcome {
    pub board: Board,
    pub points: u32,
    pub changed: bool,
    merged: [[bool; SIZE]; SIZE],
}

/// Apply a move to a board without touching any game state.
pub fn apply_move(board: &Board, dir: Move) -> MoveOutcome {
    let mut next = *board;
    let mut merged = [[false; SIZE]; SIZE];
    let mut points = 0;

    for lane in 0..SIZE {
        // Cell coordinates of this lane, ordered from the edge tiles slide toward.
        let coords: [(usize, usize); SIZE] = std::array::from_fn(|k| match dir {
            Move::Left => (lane, k),
            Move::Right => (lane, SIZE - 1 - k),
            Move::Up => (k, lane),
            Move::Down => (SIZE - 1 - k, lane),
        });
        let line = coords.map(|(r, c)| board[r][c]);
        let (slid, gained, flags) = slide_line(line);
        points += gained;
        for (k, (r, c)) in coords.iter().enumerate() {
            next[*r][*c] = slid[k];
            merged[*r][*c] = flags[k];
        }
    }

    MoveOutcome {
        changed: next != *board,
        board: next,
        points,
        merged,
    }
}

pub fn can_move(board: &Board) -> bool {
    for r in 0..SIZE {
        for c in 0..SIZE {
            if board[r][c] == 0 {
                return true;
            }
            if c + 1 < SIZE && board[r][c] == board[r][c + 1] {
                return true;
            }
            if r + 1 < SIZE && board[r][c] == board[r + 1][c] {
                return true;
            }
        }
    }
    false
}

pub struct Twenty48 {
    board: Board,
    highlight: [[Highlight; SIZE]; SIZE],
    score: u32,
    high_score: u32,
    reached_win: bool,
    win_overlay: bool,
    game_over: bool,
    rng: StdRng,
    size_guard: SizeGuard,
}

impl Twenty48 {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut g = Self {
            board: [[0; SIZE]; SIZE],
            highlight: Default::default(),
            score: 0,
            high_score: 0,
            reached_win: false,
            win_overlay: false,
            game_over: false,
            rng,
            size_guard: SizeGuard::new(CELL_W * SIZE as u16 + 2, CELL_H * SIZE as u16 + 3),
        };
        g.spawn_tile();
        g.spawn_tile();
        g
    }

    #[cfg(test)]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[cfg(test)]
    pub fn has_won(&self) -> bool {
        self.reached_win
    }

    #[cfg(test)]
    pub fn win_overlay_shown(&self) -> bool {
        self.win_overlay
    }

    fn spawn_tile(&mut self) {
        let empty: Vec<(usize, usize)> = (0..SIZE)
            .flat_map(|r| (0..SIZE).map(move |c| (r, c)))
            .filter(|(r, c)| self.board[*r][*c] == 0)
            .collect();
        if empty.is_empty() {
            return;
        }
        let (r, c) = empty[self.rng.gen_range(0..empty.len())];
        self.board[r][c] = if self.rng.gen_bool(0.9) { 2 } else { 4 };
        self.highlight[r][c] = Highlight::Spawned;
    }

    /// Play a move. Returns whether the board changed; a no-op spawns nothing.
    pub fn shift(&mut self, dir: Move) -> bool {
        if self.game_over || self.win_overlay {
            return false;
        }
        let outcome = apply_move(&self.board, dir);
        if !outcome.changed {
            return false;
        }
        self.board = outcome.board;
        self.score += outcome.points;
        self.highlight = outcome
            .merged
            .map(|row| row.map(|m| if m { Highlight::Merged } else { Highlight::None }));
        self.spawn_tile();
        self.check_status();
        true
    }

    fn check_status(&mut self) {
        if self.score > self.high_score {
            self.high_score = self.score;
        }
        if !self.reached_win && self.board.iter().flatten().any(|v| *v >= WIN_TILE) {
            self.reached_win = true;
            self.win_overlay = true;
            tracing::info!(score = self.score, "2048 reached");
            return;
        }
        if !can_move(&self.board) {
            self.game_over = true;
            tracing::info!(score = self.score, "2048 game over");
        }
    }

    /// Dismiss the win overlay and continue on the same board.
    pub fn keep_going(&mut self) {
        if !self.win_overlay {
            return;
        }
        self.win_overlay = false;
        if !can_move(&self.board) {
            self.game_over = true;
        }
    }

    #[cfg(test)]
    fn set_board(&mut self, board: Board) {
        self.board = board;
    }

    fn tile_style(value: u32) -> Style {
        let (bg, fg) = match value {
            0 => (Color::Rgb(205, 193, 180), Color::Rgb(205, 193, 180)),
            2 => (Color::Rgb(238, 228, 218), Color::Rgb(119, 110, 101)),
            4 => (Color::Rgb(237, 224, 200), Color::Rgb(119, 110, 101)),
            8 => (Color::Rgb(242, 177, 121), Color::Rgb(249, 246, 242)),
            16 => (Color::Rgb(245, 149, 99), Color::Rgb(249, 246, 242)),
            32 => (Color::Rgb(246, 124, 95), Color::Rgb(249, 246, 242)),
            64 => (Color::Rgb(246, 94, 59), Color::Rgb(249, 246, 242)),
            128 => (Color::Rgb(237, 207, 114), Color::Rgb(249, 246, 242)),
            256 => (Color::Rgb(237, 204, 97), Color::Rgb(249, 246, 242)),
            512 => (Color::Rgb(237, 200, 80), Color::Rgb(249, 246, 242)),
            1024 => (Color::Rgb(237, 197, 63), Color::Rgb(249, 246, 242)),
            2048 => (Color::Rgb(237, 194, 46), Color::Rgb(249, 246, 242)),
            _ => (Color::Rgb(60, 58, 50), Color::Rgb(249, 246, 242)),
        };
        Style::default().bg(bg).fg(fg).add_modifier(Modifier::BOLD)
    }

    fn render_board(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for r in 0..SIZE {
            for sub in 0..CELL_H {
                let mut spans = Vec::new();
                for c in 0..SIZE {
                    let value = self.board[r][c];
                    let mut style = Self::tile_style(value);
                    let inner = CELL_W as usize - 1;
                    let text = if sub == CELL_H / 2 && value != 0 {
                        format!("{:^width$}", value, width = inner)
                    } else if sub == 0 && self.highlight[r][c] != Highlight::None {
                        let mark = match self.highlight[r][c] {
                            Highlight::Spawned => "·",
                            _ => "+",
                        };
                        format!("{:<width$}", mark, width = inner)
                    } else {
                        " ".repeat(inner)
                    };
                    if self.highlight[r][c] == Highlight::Merged {
                        style = style.add_modifier(Modifier::UNDERLINED);
                    }
                    spans.push(Span::styled(text, style));
                    spans.push(Span::styled(" ", Style::default().bg(Color::Rgb(187, 173, 160))));
                }
                lines.push(Line::from(spans));
            }
        }
        lines
    }
}

impl Game for Twenty48 {
    fn update(&mut self, _dt: Duration) {}

    fn handle_input(&mut self, key: KeyEvent) {
        if self.win_overlay {
            match key.code {
                KeyCode::Char('k') | KeyCode::Char('K') | KeyCode::Enter => self.keep_going(),
                KeyCode::Char('n') | KeyCode::Char('N') => self.reset(),
                _ => {}
            }
            return;
        }
        if is_restart_key(&key) || matches!(key.code, KeyCode::Char('n') | KeyCode::Char('N')) {
            self.reset();
            return;
        }
        if self.game_over {
            if key.code == KeyCode::Enter {
                self.reset();
            }
            return;
        }
        let dir = match key.code {
            KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Move::Up,
            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Move::Down,
            KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Move::Left,
            KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Move::Right,
            _ => return,
        };
        self.shift(dir);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Rgb(143, 122, 102)))
            .title(" 🔢 2048 ")
            .title_style(Style::default().fg(Color::Rgb(237, 194, 46)).add_modifier(Modifier::BOLD));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if !self.size_guard.check(frame, inner, "2048") {
            return;
        }

        let chunks = Layout::default()
            .direction(ratatui::layout::Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(CELL_H * SIZE as u16),
                Constraint::Length(1),
            ])
            .split(inner);

        let max_tile = self.board.iter().flatten().copied().max().unwrap_or(0);
        let status = Line::from(vec![
            Span::styled(" 🔢 ", Style::default()),
            Span::styled(
                format!("Score: {} ", self.score),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            separator(),
            Span::styled(format!("Best tile: {} ", max_tile), Style::default().fg(Color::Rgb(237, 194, 46))),
            separator(),
            Span::styled(format!("🏆 Best: {} ", self.high_score), Style::default().fg(Color::Cyan)),
        ]);
        frame.render_widget(Paragraph::new(status), chunks[0]);

        let board_w = CELL_W * SIZE as u16;
        let board_h = CELL_H * SIZE as u16;
        let board_area = Rect {
            x: chunks[1].x + chunks[1].width.saturating_sub(board_w) / 2,
            y: chunks[1].y + chunks[1].height.saturating_sub(board_h) / 2,
            width: board_w.min(chunks[1].width),
            height: board_h.min(chunks[1].height),
        };
        frame.render_widget(Paragraph::new(self.render_board()), board_area);

        if self.win_overlay {
            let w = 30u16.min(board_area.width);
            let overlay = Rect::new(board_area.x + (board_area.width - w) / 2, board_area.y + board_h / 2 - 2, w, 5);
            frame.render_widget(Clear, overlay);
            let p = Paragraph::new(vec![
                Line::from(Span::styled(
                    "You reached 2048!",
                    Style::default().fg(Color::Rgb(119, 110, 101)).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled("K Keep Going  N New Game", Style::default().fg(Color::Rgb(143, 122, 102)))),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_type(BorderType::Double))
            .style(Style::default().bg(Color::Rgb(238, 228, 218)));
            frame.render_widget(p, overlay);
        }

        let bar = if self.game_over {
            Line::from(vec![
                Span::styled(" 💀 GAME OVER! ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("Final Score: {} │ Press ENTER to try again", self.score),
                    Style::default().fg(Color::Gray),
                ),
            ])
        } else {
            help_line(&[("←↑↓→/WASD", "Slide"), ("N", "New Game")])
        };
        frame.render_widget(Paragraph::new(bar), chunks[2]);
    }

    fn reset(&mut self) {
        let hs = self.high_score;
        let rng = self.rng.clone();
        *self = Twenty48::with_rng(rng);
        self.high_score = hs;
    }

    fn get_score(&self) -> u32 {
        self.score
    }

    fn is_game_over(&self) -> bool {
        self.game_over
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn line_merges_each_tile_once() {
        assert_eq!(slide_line([2, 2, 2, 2]).0, [4, 4, 0, 0]);
        assert_eq!(slide_line([4, 4, 8, 0]).0, [8, 8, 0, 0]);
        assert_eq!(slide_line([2, 0, 2, 4]).0, [4, 4, 0, 0]);
        assert_eq!(slide_line([2, 2, 4, 8]), ([4, 4, 8, 0], 4, [true, false, false, false]));
        assert_eq!(slide_line([0, 0, 0, 2]).0, [2, 0, 0, 0]);
    }

    #[test]
    fn right_and_down_process_reversed() {
        let board: Board = [[2, 2, 2, 0], [0, 0, 0, 0], [0, 0, 0, 0], [2, 0, 0, 0]];
        let right = apply_move(&board, Move::Right);
        assert_eq!(right.board[0], [0, 0, 2, 4]);
        assert_eq!(right.points, 4);
        let down = apply_move(&board, Move::Down);
        assert_eq!(down.board[3], [4, 2, 2, 0]);
        assert_eq!(down.board[0], [0, 0, 0, 0]);
    }

    #[test]
    fn blocked_move_is_a_noop_without_spawn() {
        let mut g = Twenty48::with_seed(1);
        let board: Board = [[2, 4, 0, 0], [4, 2, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]];
        g.set_board(board);
        assert!(!g.shift(Move::Left));
        assert_eq!(g.board(), &board);
        assert_eq!(g.get_score(), 0);
    }

    #[test]
    fn changing_move_spawns_exactly_one_tile() {
        let mut g = Twenty48::with_seed(2);
        g.set_board([[2, 2, 0, 0], [0; SIZE], [0; SIZE], [0; SIZE]]);
        assert!(g.shift(Move::Left));
        let tiles = g.board().iter().flatten().filter(|v| **v != 0).count();
        assert_eq!(tiles, 2);
        assert_eq!(g.board()[0][0], 4);
        assert_eq!(g.get_score(), 4);
    }

    #[test]
    fn full_board_without_pairs_is_game_over() {
        let board: Board = [[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]];
        assert!(!can_move(&board));
        let mut almost = board;
        almost[3][3] = 4;
        assert!(can_move(&almost));
    }

    #[test]
    fn reaching_2048_shows_overlay_and_keep_going_resumes() {
        let mut g = Twenty48::with_seed(3);
        g.set_board([[1024, 1024, 0, 0], [0; SIZE], [0; SIZE], [0; SIZE]]);
        assert!(g.shift(Move::Left));
        assert!(g.has_won());
        assert!(g.win_overlay_shown());
        assert!(!g.is_game_over());
        // Moves are held while the overlay is up.
        assert!(!g.shift(Move::Right));
        g.keep_going();
        assert!(!g.win_overlay_shown());
        assert!(g.shift(Move::Right));
        // The overlay doesn't come back for the same run.
        assert!(!g.win_overlay_shown());
    }

    #[test]
    fn new_game_has_two_tiles() {
        let g = Twenty48::with_seed(4);
        let tiles: Vec<u32> = g.board().iter().flatten().copied().filter(|v| *v != 0).collect();
        assert_eq!(tiles.len(), 2);
        assert!(tiles.iter().all(|v| *v == 2 || *v == 4));
    }

    fn board_strategy() -> impl Strategy<Value = Board> {
        let cell = prop_oneof![Just(0u32), (1u32..8).prop_map(|e| 1u32 << e)];
        proptest::array::uniform4(proptest::array::uniform4(cell))
    }

    fn move_strategy() -> impl Strategy<Value = Move> {
        prop_oneof![Just(Move::Up), Just(Move::Down), Just(Move::Left), Just(Move::Right)]
    }

    proptest! {
        #[test]
        fn moves_preserve_sum_and_powers_of_two(board in board_strategy(), dir in move_strategy()) {
            let out = apply_move(&board, dir);
            let before: u32 = board.iter().flatten().sum();
            let after: u32 = out.board.iter().flatten().sum();
            prop_assert_eq!(before, after);
            prop_assert!(out.board.iter().flatten().all(|v| *v == 0 || v.is_power_of_two()));
            prop_assert_eq!(out.changed, out.board != board);
            // Merge count bounded by half the tiles: each tile merges at most once.
            let tiles_before = board.iter().flatten().filter(|v| **v != 0).count();
            let tiles_after = out.board.iter().flatten().filter(|v| **v != 0).count();
            let merges = out.merged.iter().flatten().filter(|m| **m).count();
            prop_assert_eq!(tiles_before - tiles_after, merges);
        }

        #[test]
        fn score_grows_by_merged_values(seed in any::<u64>(), dirs in proptest::collection::vec(move_strategy(), 1..60)) {
            let mut g = Twenty48::with_seed(seed);
            for dir in dirs {
                let before = g.get_score();
                let expected = apply_move(g.board(), dir);
                let changed = g.shift(dir);
                if g.win_overlay_shown() {
                    g.keep_going();
                }
                if changed {
                    prop_assert_eq!(g.get_score(), before + expected.points);
                } else {
                    prop_assert_eq!(g.get_score(), before);
                }
            }
        }
    }
}
