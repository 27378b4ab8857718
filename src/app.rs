use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventState, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::calculator::{Action, Calculator};
use crate::games::{local_cell, Game, GameId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Calculator,
    Game(GameId),
}

/// Clickable regions of the calculator view, refreshed on every draw.
#[derive(Default)]
pub struct CalculatorHits {
    pub keypad: Vec<(Rect, &'static str)>,
    pub history: Vec<(Rect, usize)>,
    pub guidance_toggle: Option<Rect>,
}

pub struct App {
    pub should_quit: bool,
    pub calculator: Calculator,
    pub hits: CalculatorHits,
    active: Option<(GameId, Box<dyn Game>)>,
    last_tick: Instant,
}

/// Alt+CapsLock, either as the CapsLock key itself or as any Alt chord while
/// the terminal reports caps lock on.
pub fn is_return_hotkey(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::ALT)
        && (key.code == KeyCode::CapsLock || key.state.contains(KeyEventState::CAPS_LOCK))
}

impl App {
    pub fn new() -> Self {
        Self::with_calculator(Calculator::new())
    }

    pub fn with_calculator(calculator: Calculator) -> Self {
        Self {
            should_quit: false,
            calculator,
            hits: CalculatorHits::default(),
            active: None,
            last_tick: Instant::now(),
        }
    }

    pub fn view(&self) -> View {
        match &self.active {
            Some((id, _)) => View::Game(*id),
            None => View::Calculator,
        }
    }

    pub fn game_mut(&mut self) -> Option<&mut Box<dyn Game>> {
        self.active.as_mut().map(|(_, game)| game)
    }

    /// Swap the calculator for a fresh instance of `id`. Any running game is
    /// dropped first, and its timers with it.
    pub fn launch(&mut self, id: GameId) {
        if let Some((old, _)) = self.active.take() {
            tracing::info!(game = old.title(), "game stopped");
        }
        self.calculator.on_game_launched();
        self.active = Some((id, id.create()));
        self.last_tick = Instant::now();
        tracing::info!(game = id.title(), "game launched");
    }

    /// Back to the calculator. Returns false, doing nothing, when no game is
    /// active.
    pub fn return_to_calculator(&mut self) -> bool {
        let Some((id, game)) = self.active.take() else {
            return false;
        };
        tracing::info!(
            game = id.title(),
            score = game.get_score(),
            finished = game.is_game_over(),
            "returned to calculator"
        );
        drop(game);
        self.hits = CalculatorHits::default();
        self.calculator.on_return();
        true
    }

    pub fn on_tick(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick);
        self.last_tick = now;
        self.advance(dt);
    }

    pub fn advance(&mut self, dt: Duration) {
        if let Some(game) = self.game_mut() {
            game.update(dt);
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if is_return_hotkey(&key) {
            self.return_to_calculator();
            return;
        }

        if self.active.is_some() {
            if key.code == KeyCode::Esc {
                self.return_to_calculator();
            } else if let Some(game) = self.game_mut() {
                game.handle_input(key);
            }
            return;
        }

        let action = self.calculator.handle_key(key);
        self.apply(action);
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Launch(id) => self.launch(id),
            Action::Quit => self.should_quit = true,
        }
    }

    pub fn on_key_release(&mut self, key: KeyEvent) {
        if let Some(game) = self.game_mut() {
            game.handle_key_release(key);
        }
    }

    pub fn on_mouse(&mut self, mouse: MouseEvent) {
        if let Some(game) = self.game_mut() {
            game.handle_mouse(mouse);
            return;
        }
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let hit = |r: &Rect| local_cell(*r, mouse.column, mouse.row).is_some();
        let button = self.hits.keypad.iter().find(|(r, _)| hit(r)).map(|&(_, label)| label);
        let entry = self.hits.history.iter().find(|(r, _)| hit(r)).map(|&(_, index)| index);
        if let Some(label) = button {
            let action = self.calculator.press_button(label);
            self.apply(action);
        } else if let Some(index) = entry {
            self.calculator.recall(index);
        } else if self.hits.guidance_toggle.as_ref().is_some_and(hit) {
            self.calculator.toggle_guidance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(app: &mut App, code: KeyCode) {
        app.on_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_in(app: &mut App, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn app() -> App {
        App::with_calculator(Calculator::with_seed(42))
    }

    fn click(app: &mut App, column: u16, row: u16) {
        app.on_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        });
    }

    #[test]
    fn one_plus_one_launches_a_fresh_snake() {
        let mut app = app();
        type_in(&mut app, "1+1");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view(), View::Game(GameId::Snake));
        let game = app.game_mut().unwrap();
        assert_eq!(game.get_score(), 0);
        assert!(!game.is_game_over());
        assert!(!app.calculator.guidance_available());
    }

    #[test]
    fn plain_arithmetic_stays_on_the_calculator() {
        let mut app = app();
        type_in(&mut app, "99*2");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view(), View::Calculator);
        assert_eq!(app.calculator.display(), "198");
        assert_eq!(app.calculator.history()[0], "99*2 = 198");

        press(&mut app, KeyCode::Esc);
        type_in(&mut app, "5/0=");
        assert_eq!(app.calculator.display(), "Error");
    }

    #[test]
    fn return_is_idempotent() {
        let mut app = app();
        assert!(!app.return_to_calculator());
        assert_eq!(app.calculator.display(), "");

        app.launch(GameId::Pong);
        assert!(app.return_to_calculator());
        assert_eq!(app.view(), View::Calculator);
        let camouflage = app.calculator.display().to_string();
        assert!(!camouflage.is_empty());

        assert!(!app.return_to_calculator());
        assert_eq!(app.calculator.display(), camouflage);
    }

    #[test]
    fn launching_replaces_the_running_game() {
        let mut app = app();
        app.launch(GameId::Minesweeper);
        app.launch(GameId::Twenty48);
        assert_eq!(app.view(), View::Game(GameId::Twenty48));
    }

    #[test]
    fn alt_capslock_and_esc_both_return() {
        let mut app = app();
        app.launch(GameId::MemoryMatch);
        app.on_key(KeyEvent::new(KeyCode::CapsLock, KeyModifiers::ALT));
        assert_eq!(app.view(), View::Calculator);

        app.launch(GameId::CatchBall);
        let mut chord = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT);
        chord.state = KeyEventState::CAPS_LOCK;
        app.on_key(chord);
        assert_eq!(app.view(), View::Calculator);

        app.launch(GameId::ColorReaction);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.view(), View::Calculator);
    }

    #[test]
    fn game_keys_do_not_reach_the_calculator() {
        let mut app = app();
        app.launch(GameId::Snake);
        app.calculator.clear();
        type_in(&mut app, "12q");
        assert!(!app.should_quit);
        assert_eq!(app.calculator.display(), "");
    }

    #[test]
    fn ctrl_c_quits_from_anywhere() {
        let mut app = app();
        app.launch(GameId::Snake);
        app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn q_quits_from_the_calculator() {
        let mut app = app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn ticks_drive_only_the_active_game() {
        let mut app = app();
        app.advance(Duration::from_secs(1));
        app.launch(GameId::Snake);
        app.advance(Duration::from_millis(500));
        assert_eq!(app.view(), View::Game(GameId::Snake));
    }

    #[test]
    fn keypad_and_history_are_clickable() {
        let mut app = app();
        app.hits.keypad = vec![
            (Rect::new(0, 0, 4, 1), "2"),
            (Rect::new(5, 0, 4, 1), "+"),
            (Rect::new(10, 0, 4, 1), "="),
        ];
        app.hits.history = vec![(Rect::new(0, 5, 20, 1), 0)];
        for column in [1, 6, 1, 11] {
            click(&mut app, column, 0);
        }
        assert_eq!(app.view(), View::Game(GameId::Pong));

        app.return_to_calculator();
        app.hits.history = vec![(Rect::new(0, 5, 20, 1), 0)];
        click(&mut app, 3, 5);
        assert_eq!(app.calculator.display(), "(88 - 14) / 2");
    }
}
