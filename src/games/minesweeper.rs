use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::timer::{ms, Interval};
use crate::games::{help_line, is_restart_key, local_cell, separator, Game, SizeGuard};

const CELL_W: u16 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// (rows, cols, mines)
    pub fn dims(self) -> (usize, usize, usize) {
        match self {
            Difficulty::Easy => (9, 9, 10),
            Difficulty::Medium => (16, 16, 40),
            Difficulty::Hard => (16, 30, 99),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tile {
    pub is_mine: bool,
    pub is_revealed: bool,
    pub is_flagged: bool,
    pub adjacent: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Playing,
    Won,
    Lost,
}

pub struct Minesweeper {
    difficulty: Difficulty,
    rows: usize,
    cols: usize,
    mines: usize,
    grid: Vec<Tile>,
    // Mines go down on the first reveal so it can never detonate.
    mines_placed: bool,
    revealed: usize,
    flags: usize,
    outcome: Outcome,
    exploded: Option<(usize, usize)>,
    seconds: u32,
    clock: Interval,
    cursor: (usize, usize),
    field_area: Rect,
    rng: StdRng,
    size_guard: SizeGuard,
}

impl Minesweeper {
    pub fn new() -> Self {
        Self::build(Difficulty::Medium, StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn with_seed(difficulty: Difficulty, seed: u64) -> Self {
        Self::build(difficulty, StdRng::seed_from_u64(seed))
    }

    fn build(difficulty: Difficulty, rng: StdRng) -> Self {
        let (rows, cols, mines) = difficulty.dims();
        Self {
            difficulty,
            rows,
            cols,
            mines,
            grid: vec![Tile::default(); rows * cols],
            mines_placed: false,
            revealed: 0,
            flags: 0,
            outcome: Outcome::Playing,
            exploded: None,
            seconds: 0,
            clock: Interval::clock(ms(1000)),
            cursor: (rows / 2, cols / 2),
            field_area: Rect::default(),
            rng,
            size_guard: SizeGuard::new(cols as u16 * CELL_W + 2, rows as u16 + 4),
        }
    }

    #[cfg(test)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[cfg(test)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[cfg(test)]
    pub fn mine_count(&self) -> usize {
        self.mines
    }

    #[cfg(test)]
    pub fn revealed_count(&self) -> usize {
        self.revealed
    }

    #[cfg(test)]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn mines_left(&self) -> i64 {
        self.mines as i64 - self.flags as i64
    }

    #[cfg(test)]
    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn tile(&self, r: usize, c: usize) -> Tile {
        self.grid[self.idx(r, c)]
    }

    fn idx(&self, r: usize, c: usize) -> usize {
        r * self.cols + c
    }

    fn neighbors(&self, r: usize, c: usize) -> impl Iterator<Item = (usize, usize)> {
        let (rows, cols) = (self.rows as i64, self.cols as i64);
        (-1i64..=1)
            .flat_map(|dr| (-1i64..=1).map(move |dc| (dr, dc)))
            .filter(|&(dr, dc)| dr != 0 || dc != 0)
            .map(move |(dr, dc)| (r as i64 + dr, c as i64 + dc))
            .filter(move |&(nr, nc)| nr >= 0 && nr < rows && nc >= 0 && nc < cols)
            .map(|(nr, nc)| (nr as usize, nc as usize))
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        let rng = self.rng.clone();
        *self = Self::build(difficulty, rng);
        tracing::debug!(difficulty = difficulty.label(), "minesweeper difficulty changed");
    }

    fn place_mines(&mut self, safe_r: usize, safe_c: usize) {
        let safe = self.idx(safe_r, safe_c);
        let total = self.rows * self.cols;
        for i in sample(&mut self.rng, total - 1, self.mines).into_iter() {
            // Sample over every index except the safe one.
            let i = if i >= safe { i + 1 } else { i };
            self.grid[i].is_mine = true;
        }
        self.mines_placed = true;
        self.count_adjacent();
    }

    fn count_adjacent(&mut self) {
        for r in 0..self.rows {
            for c in 0..self.cols {
                let n = self
                    .neighbors(r, c)
                    .filter(|&(nr, nc)| self.grid[self.idx(nr, nc)].is_mine)
                    .count() as u8;
                let i = self.idx(r, c);
                self.grid[i].adjacent = n;
            }
        }
    }

    /// Left click. On a hidden cell this reveals; on a revealed number it
    /// chords.
    pub fn reveal(&mut self, r: usize, c: usize) {
        if self.outcome != Outcome::Playing || r >= self.rows || c >= self.cols {
            return;
        }
        let tile = self.tile(r, c);
        if tile.is_flagged {
            return;
        }
        if tile.is_revealed {
            if tile.adjacent > 0 {
                self.chord(r, c);
            }
            return;
        }
        if !self.mines_placed {
            self.place_mines(r, c);
            self.clock.reset();
        }
        if tile.is_mine {
            self.explode(r, c);
            return;
        }
        self.flood_reveal(r, c);
        self.check_win();
    }

    /// Reveal a safe cell and, across zero-adjacency cells, everything
    /// reachable from it. Uses a work stack instead of recursion.
    fn flood_reveal(&mut self, r: usize, c: usize) {
        let mut stack = vec![(r, c)];
        while let Some((r, c)) = stack.pop() {
            let i = self.idx(r, c);
            let tile = self.grid[i];
            if tile.is_revealed || tile.is_flagged || tile.is_mine {
                continue;
            }
            self.grid[i].is_revealed = true;
            self.revealed += 1;
            if tile.adjacent == 0 {
                let next: Vec<_> = self
                    .neighbors(r, c)
                    .filter(|&(nr, nc)| {
                        let t = self.grid[self.idx(nr, nc)];
                        !t.is_revealed && !t.is_flagged
                    })
                    .collect();
                stack.extend(next);
            }
        }
    }

    pub fn toggle_flag(&mut self, r: usize, c: usize) {
        if self.outcome != Outcome::Playing || r >= self.rows || c >= self.cols {
            return;
        }
        let i = self.idx(r, c);
        if self.grid[i].is_revealed {
            return;
        }
        self.grid[i].is_flagged = !self.grid[i].is_flagged;
        if self.grid[i].is_flagged {
            self.flags += 1;
        } else {
            self.flags -= 1;
        }
    }

    /// Reveal every unflagged neighbour of a revealed number once the flags
    /// around it account for all its mines.
    pub fn chord(&mut self, r: usize, c: usize) {
        if self.outcome != Outcome::Playing {
            return;
        }
        let tile = self.tile(r, c);
        if !tile.is_revealed || tile.adjacent == 0 {
            return;
        }
        let flagged = self
            .neighbors(r, c)
            .filter(|&(nr, nc)| self.tile(nr, nc).is_flagged)
            .count();
        if flagged != tile.adjacent as usize {
            return;
        }
        let targets: Vec<_> = self
            .neighbors(r, c)
            .filter(|&(nr, nc)| {
                let t = self.tile(nr, nc);
                !t.is_flagged && !t.is_revealed
            })
            .collect();
        for (nr, nc) in targets {
            if self.tile(nr, nc).is_mine {
                self.explode(nr, nc);
                return;
            }
            self.flood_reveal(nr, nc);
        }
        self.check_win();
    }

    fn explode(&mut self, r: usize, c: usize) {
        let i = self.idx(r, c);
        self.grid[i].is_revealed = true;
        self.exploded = Some((r, c));
        self.finish(Outcome::Lost);
    }

    fn check_win(&mut self) {
        if self.outcome == Outcome::Playing && self.revealed == self.rows * self.cols - self.mines {
            self.finish(Outcome::Won);
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        self.outcome = outcome;
        for tile in self.grid.iter_mut().filter(|t| t.is_mine) {
            tile.is_revealed = true;
        }
        tracing::info!(
            difficulty = self.difficulty.label(),
            won = outcome == Outcome::Won,
            seconds = self.seconds,
            "minesweeper finished"
        );
    }

    #[cfg(test)]
    fn with_layout(rows: usize, cols: usize, mines: &[(usize, usize)]) -> Self {
        let mut m = Self::with_seed(Difficulty::Easy, 0);
        m.rows = rows;
        m.cols = cols;
        m.mines = mines.len();
        m.grid = vec![Tile::default(); rows * cols];
        for &(r, c) in mines {
            let i = m.idx(r, c);
            m.grid[i].is_mine = true;
        }
        m.mines_placed = true;
        m.count_adjacent();
        m
    }

    fn cell_span(&self, r: usize, c: usize) -> Span<'static> {
        let tile = self.tile(r, c);
        let selected = self.cursor == (r, c) && self.outcome == Outcome::Playing;
        let hidden_bg = if selected { Color::Rgb(120, 140, 200) } else { Color::Rgb(160, 160, 170) };
        let open_bg = if selected { Color::Rgb(170, 180, 220) } else { Color::Rgb(215, 215, 220) };

        if tile.is_flagged {
            if self.outcome == Outcome::Lost && !tile.is_mine {
                return Span::styled("❌", Style::default().bg(Color::Rgb(255, 204, 204)));
            }
            return Span::styled("🚩", Style::default().bg(hidden_bg));
        }
        if !tile.is_revealed {
            return Span::styled("▒▒", Style::default().fg(Color::Rgb(140, 140, 150)).bg(hidden_bg));
        }
        if tile.is_mine {
            let bg = if self.exploded == Some((r, c)) { Color::Red } else { open_bg };
            return Span::styled("💣", Style::default().bg(bg));
        }
        if tile.adjacent == 0 {
            return Span::styled("  ", Style::default().bg(open_bg));
        }
        let fg = match tile.adjacent {
            1 => Color::Rgb(0, 0, 255),
            2 => Color::Rgb(0, 128, 0),
            3 => Color::Rgb(255, 0, 0),
            4 => Color::Rgb(0, 0, 128),
            5 => Color::Rgb(128, 0, 0),
            6 => Color::Rgb(0, 128, 128),
            7 => Color::Black,
            _ => Color::Rgb(128, 128, 128),
        };
        Span::styled(
            format!("{} ", tile.adjacent),
            Style::default().fg(fg).bg(open_bg).add_modifier(Modifier::BOLD),
        )
    }

    fn move_cursor(&mut self, dr: i64, dc: i64) {
        let r = (self.cursor.0 as i64 + dr).clamp(0, self.rows as i64 - 1);
        let c = (self.cursor.1 as i64 + dc).clamp(0, self.cols as i64 - 1);
        self.cursor = (r as usize, c as usize);
    }
}

impl Game for Minesweeper {
    fn update(&mut self, dt: Duration) {
        if !self.mines_placed || self.outcome != Outcome::Playing {
            return;
        }
        self.seconds += self.clock.advance(dt);
    }

    fn handle_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('1') => self.set_difficulty(Difficulty::Easy),
            KeyCode::Char('2') => self.set_difficulty(Difficulty::Medium),
            KeyCode::Char('3') => self.set_difficulty(Difficulty::Hard),
            _ if is_restart_key(&key) => self.set_difficulty(self.difficulty),
            KeyCode::Enter if self.outcome != Outcome::Playing => self.set_difficulty(self.difficulty),
            KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => self.move_cursor(-1, 0),
            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => self.move_cursor(1, 0),
            KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => self.move_cursor(0, -1),
            KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => self.move_cursor(0, 1),
            KeyCode::Char(' ') | KeyCode::Enter => self.reveal(self.cursor.0, self.cursor.1),
            KeyCode::Char('f') | KeyCode::Char('F') => self.toggle_flag(self.cursor.0, self.cursor.1),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let Some((x, y)) = local_cell(self.field_area, mouse.column, mouse.row) else {
            return;
        };
        let (r, c) = (y as usize, (x / CELL_W) as usize);
        if r >= self.rows || c >= self.cols {
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.cursor = (r, c);
                self.reveal(r, c);
            }
            MouseEventKind::Down(MouseButton::Right) => {
                self.cursor = (r, c);
                self.toggle_flag(r, c);
            }
            MouseEventKind::Down(MouseButton::Middle) => self.chord(r, c),
            MouseEventKind::Moved => self.cursor = (r, c),
            _ => {}
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Rgb(120, 120, 130)))
            .title(" 💣 Minesweeper ")
            .title_style(Style::default().fg(Color::Rgb(220, 220, 230)).add_modifier(Modifier::BOLD));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if !self.size_guard.check(frame, inner, "Minesweeper") {
            self.field_area = Rect::default();
            return;
        }

        let chunks = Layout::default()
            .direction(ratatui::layout::Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(self.rows as u16),
                Constraint::Length(1),
            ])
            .split(inner);

        let face = match self.outcome {
            Outcome::Playing => "🙂",
            Outcome::Won => "😎",
            Outcome::Lost => "😵",
        };
        let status = Line::from(vec![
            Span::styled(format!(" {} ", face), Style::default()),
            Span::styled(
                format!("Mines: {} ", self.mines_left()),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            separator(),
            Span::styled(format!("Time: {} ", self.seconds), Style::default().fg(Color::Yellow)),
            separator(),
            Span::styled(
                format!(
                    "{} ({}x{}, {} mines) ",
                    self.difficulty.label(),
                    self.rows,
                    self.cols,
                    self.mines
                ),
                Style::default().fg(Color::Cyan),
            ),
        ]);
        frame.render_widget(Paragraph::new(status), chunks[0]);

        let w = self.cols as u16 * CELL_W;
        let h = self.rows as u16;
        self.field_area = Rect {
            x: chunks[1].x + chunks[1].width.saturating_sub(w) / 2,
            y: chunks[1].y + chunks[1].height.saturating_sub(h) / 2,
            width: w.min(chunks[1].width),
            height: h.min(chunks[1].height),
        };
        let lines: Vec<Line> = (0..self.rows)
            .map(|r| Line::from((0..self.cols).map(|c| self.cell_span(r, c)).collect::<Vec<_>>()))
            .collect();
        frame.render_widget(Paragraph::new(lines), self.field_area);

        let bar = match self.outcome {
            Outcome::Won => Line::from(vec![
                Span::styled(" 🎉 You Win! ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("Cleared in {}s │ Press ENTER for a new board", self.seconds),
                    Style::default().fg(Color::Gray),
                ),
            ]),
            Outcome::Lost => Line::from(vec![
                Span::styled(" 💣 Game Over! ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Span::styled("Press ENTER for a new board", Style::default().fg(Color::Gray)),
            ]),
            Outcome::Playing => help_line(&[
                ("Click/Space", "Reveal"),
                ("Right-click/F", "Flag"),
                ("1 2 3", "Difficulty"),
                ("R", "Reset"),
            ]),
        };
        frame.render_widget(Paragraph::new(bar), chunks[2]);
    }

    fn reset(&mut self) {
        self.set_difficulty(self.difficulty);
    }

    fn get_score(&self) -> u32 {
        self.revealed as u32
    }

    fn is_game_over(&self) -> bool {
        self.outcome != Outcome::Playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::test_support::{draw, left_click, mouse};
    use proptest::prelude::*;

    #[test]
    fn first_reveal_is_always_safe() {
        for seed in 0..50 {
            let mut m = Minesweeper::with_seed(Difficulty::Hard, seed);
            m.reveal(7, 12);
            assert_ne!(m.outcome(), Outcome::Lost, "seed {}", seed);
            assert!(!m.tile(7, 12).is_mine);
            let mines = (0..m.rows())
                .flat_map(|r| (0..m.cols()).map(move |c| (r, c)))
                .filter(|&(r, c)| m.tile(r, c).is_mine)
                .count();
            assert_eq!(mines, 99);
        }
    }

    #[test]
    fn zero_region_floods_to_its_numbered_border() {
        // Single mine in the corner of a 4x4: everything else opens at once.
        let mut m = Minesweeper::with_layout(4, 4, &[(0, 0)]);
        m.reveal(3, 3);
        assert_eq!(m.revealed_count(), 15);
        assert_eq!(m.outcome(), Outcome::Won);
    }

    #[test]
    fn flood_stops_at_numbers() {
        // A wall of mines down column 2 splits the board.
        let mut m = Minesweeper::with_layout(3, 5, &[(0, 2), (1, 2), (2, 2)]);
        m.reveal(1, 0);
        for r in 0..3 {
            assert!(m.tile(r, 0).is_revealed);
            assert!(m.tile(r, 1).is_revealed);
            assert!(!m.tile(r, 3).is_revealed);
            assert!(!m.tile(r, 4).is_revealed);
        }
        assert_eq!(m.revealed_count(), 6);
        assert_eq!(m.outcome(), Outcome::Playing);
    }

    #[test]
    fn flags_block_reveal_and_count_down() {
        let mut m = Minesweeper::with_layout(3, 3, &[(0, 0)]);
        m.toggle_flag(2, 2);
        assert_eq!(m.mines_left(), 0);
        m.reveal(2, 2);
        assert!(!m.tile(2, 2).is_revealed);
        m.toggle_flag(2, 2);
        assert_eq!(m.mines_left(), 1);
    }

    #[test]
    fn chord_reveals_neighbours_when_flags_match() {
        let mut m = Minesweeper::with_layout(3, 3, &[(0, 0)]);
        m.reveal(1, 1);
        assert_eq!(m.tile(1, 1).adjacent, 1);
        assert_eq!(m.revealed_count(), 1);
        m.toggle_flag(0, 0);
        m.reveal(1, 1);
        assert_eq!(m.revealed_count(), 8);
        assert_eq!(m.outcome(), Outcome::Won);
    }

    #[test]
    fn chord_with_wrong_flag_detonates() {
        let mut m = Minesweeper::with_layout(3, 3, &[(0, 0)]);
        m.reveal(1, 1);
        m.toggle_flag(0, 1);
        m.chord(1, 1);
        assert_eq!(m.outcome(), Outcome::Lost);
        assert!(m.tile(0, 0).is_revealed);
    }

    #[test]
    fn chord_needs_matching_flag_count() {
        let mut m = Minesweeper::with_layout(3, 3, &[(0, 0)]);
        m.reveal(1, 1);
        m.chord(1, 1);
        assert_eq!(m.revealed_count(), 1);
        assert_eq!(m.outcome(), Outcome::Playing);
    }

    #[test]
    fn revealing_a_mine_loses_and_shows_all_mines() {
        let mut m = Minesweeper::with_layout(3, 3, &[(0, 0), (2, 2)]);
        m.reveal(0, 0);
        assert_eq!(m.outcome(), Outcome::Lost);
        assert!(m.tile(2, 2).is_revealed);
        assert!(m.is_game_over());
    }

    #[test]
    fn difficulty_change_resets_everything() {
        let mut m = Minesweeper::with_seed(Difficulty::Medium, 3);
        m.reveal(0, 0);
        m.update(Duration::from_millis(2500));
        assert_eq!(m.seconds(), 2);
        m.set_difficulty(Difficulty::Easy);
        assert_eq!((m.rows(), m.cols(), m.mine_count()), (9, 9, 10));
        assert_eq!(m.revealed_count(), 0);
        assert_eq!(m.seconds(), 0);
        assert_eq!(m.outcome(), Outcome::Playing);
    }

    #[test]
    fn clock_waits_for_first_reveal() {
        let mut m = Minesweeper::with_seed(Difficulty::Easy, 4);
        m.update(Duration::from_secs(5));
        assert_eq!(m.seconds(), 0);
        m.reveal(4, 4);
        m.update(Duration::from_millis(1000));
        if m.outcome() == Outcome::Playing {
            assert_eq!(m.seconds(), 1);
            // A stalled host still gets every second back.
            m.update(Duration::from_secs(60));
            assert_eq!(m.seconds(), 61);
        }
    }

    #[test]
    fn mouse_buttons_map_onto_field_cells() {
        let mut m = Minesweeper::with_seed(Difficulty::Easy, 11);
        draw(&mut m, 60, 20);
        let field = m.field_area;
        assert_eq!((field.width, field.height), (9 * CELL_W, 9));

        // Either half of a two-column cell hits it.
        m.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Right), field.x + 3 * CELL_W + 1, field.y + 2));
        assert!(m.tile(2, 3).is_flagged);
        assert_eq!(m.mines_left(), 9);

        m.handle_mouse(left_click(field.x + 5 * CELL_W, field.y + 4));
        assert!(m.tile(4, 5).is_revealed);
        assert_eq!(m.cursor, (4, 5));

        let revealed = m.revealed_count();
        m.handle_mouse(left_click(field.x - 1, field.y));
        m.handle_mouse(left_click(field.x, field.y + field.height));
        assert_eq!(m.revealed_count(), revealed);
    }

    proptest! {
        #[test]
        fn flood_fill_reveals_a_closed_connected_region(seed in any::<u64>(), r in 0usize..9, c in 0usize..9) {
            let mut m = Minesweeper::with_seed(Difficulty::Easy, seed);
            m.reveal(r, c);
            prop_assert_ne!(m.outcome(), Outcome::Lost);

            let revealed: Vec<(usize, usize)> = (0..m.rows())
                .flat_map(|r| (0..m.cols()).map(move |c| (r, c)))
                .filter(|&(r, c)| m.tile(r, c).is_revealed && !m.tile(r, c).is_mine)
                .collect();
            prop_assert_eq!(revealed.len(), m.revealed_count());

            for &(rr, cc) in &revealed {
                let t = m.tile(rr, cc);
                // Every opened zero opens all of its neighbours.
                if t.adjacent == 0 {
                    for (nr, nc) in m.neighbors(rr, cc) {
                        prop_assert!(m.tile(nr, nc).is_revealed);
                    }
                }
                // Every opened cell is the start or touches an opened zero.
                if (rr, cc) != (r, c) {
                    let touches_zero = m
                        .neighbors(rr, cc)
                        .any(|(nr, nc)| m.tile(nr, nc).is_revealed && m.tile(nr, nc).adjacent == 0 && !m.tile(nr, nc).is_mine);
                    prop_assert!(touches_zero);
                }
            }

            let won = m.revealed_count() == m.rows() * m.cols() - m.mine_count();
            prop_assert_eq!(won, m.outcome() == Outcome::Won);
        }
    }
}
