pub mod eval;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::games::GameId;

pub const HISTORY_CAP: usize = 20;

/// Keypad rows, top to bottom.
pub const KEYPAD: [[&str; 4]; 5] = [
    ["C", "(", ")", "/"],
    ["7", "8", "9", "*"],
    ["4", "5", "6", "-"],
    ["1", "2", "3", "+"],
    ["0", ".", "%", "="],
];

const HARD_EXPRESSIONS: [&str; 2] = ["((32*14+108)/7 + 92 - 18) * 3", "(256 + 512) / (8 * 2) + 17"];

const FAKE_HISTORY: [&str; 3] = ["(12 + 34) * 2 = 92", "72 / (6 + 3) = 8", "(88 - 14) / 2 = 37"];

pub const ERROR_TEXT: &str = "Error";

/// What pressing `=` did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Equals {
    Launch(GameId),
    Value(String),
    Error,
}

/// What a key or keypad press asks the host to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    None,
    Launch(GameId),
    Quit,
}

pub struct Calculator {
    display: String,
    // Most recent first.
    history: Vec<String>,
    guidance_open: bool,
    // Once a game has launched the panel never comes back this session.
    guidance_retired: bool,
    rng: StdRng,
}

impl Calculator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut calc = Self {
            display: String::new(),
            history: Vec::with_capacity(HISTORY_CAP),
            guidance_open: false,
            guidance_retired: false,
            rng,
        };
        calc.insert_fake_history();
        calc
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn guidance_available(&self) -> bool {
        !self.guidance_retired
    }

    pub fn guidance_open(&self) -> bool {
        self.guidance_open && !self.guidance_retired
    }

    pub fn toggle_guidance(&mut self) {
        if !self.guidance_retired {
            self.guidance_open = !self.guidance_open;
        }
    }

    /// Append a typed character if the keypad would accept it.
    pub fn input(&mut self, c: char) -> bool {
        let accepted = c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '%' | '(' | ')' | '.');
        if !accepted || (c == '.' && self.display.contains('.')) {
            return false;
        }
        self.display.push(c);
        true
    }

    pub fn backspace(&mut self) {
        self.display.pop();
    }

    pub fn clear(&mut self) {
        self.display.clear();
    }

    pub fn press_equals(&mut self) -> Equals {
        let input = self.display.trim().to_string();
        if let Some(id) = GameId::from_trigger(&input) {
            return Equals::Launch(id);
        }
        match eval::evaluate(&input) {
            Ok(value) => {
                let result = eval::format_number(value);
                self.add_history(format!("{} = {}", input, result));
                self.display = result.clone();
                Equals::Value(result)
            }
            Err(err) => {
                tracing::debug!(input = %input, error = %err, "expression rejected");
                self.display = ERROR_TEXT.to_string();
                Equals::Error
            }
        }
    }

    fn add_history(&mut self, entry: String) {
        self.history.insert(0, entry);
        self.history.truncate(HISTORY_CAP);
    }

    /// Load the left-hand side of a history entry into the display.
    pub fn recall(&mut self, index: usize) {
        if let Some(entry) = self.history.get(index) {
            let lhs = entry.split('=').next().unwrap_or_default().trim();
            self.display = lhs.to_string();
        }
    }

    fn insert_fake_history(&mut self) {
        self.history.clear();
        for entry in FAKE_HISTORY {
            self.add_history(entry.to_string());
        }
    }

    pub fn on_game_launched(&mut self) {
        self.guidance_retired = true;
        self.guidance_open = false;
    }

    /// Cover tracks after leaving a game.
    pub fn on_return(&mut self) {
        self.guidance_retired = true;
        self.display = HARD_EXPRESSIONS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(HARD_EXPRESSIONS[0])
            .to_string();
        self.insert_fake_history();
    }

    /// A click on a keypad button.
    pub fn press_button(&mut self, label: &str) -> Action {
        match label {
            "C" => self.clear(),
            "=" => return self.equals_action(),
            _ => {
                for c in label.chars() {
                    self.input(c);
                }
            }
        }
        Action::None
    }

    fn equals_action(&mut self) -> Action {
        match self.press_equals() {
            Equals::Launch(id) => Action::Launch(id),
            Equals::Value(_) | Equals::Error => Action::None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if !key.modifiers.difference(KeyModifiers::SHIFT).is_empty() {
            return Action::None;
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char('=') => return self.equals_action(),
            KeyCode::Esc | KeyCode::Char('c') | KeyCode::Char('C') | KeyCode::Delete => self.clear(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char('g') | KeyCode::Char('G') => self.toggle_guidance(),
            KeyCode::Char('q') | KeyCode::Char('Q') => return Action::Quit,
            KeyCode::Char(c) => {
                self.input(c);
            }
            _ => {}
        }
        Action::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_in(calc: &mut Calculator, s: &str) {
        for c in s.chars() {
            calc.input(c);
        }
    }

    #[test]
    fn evaluates_and_records_history() {
        let mut calc = Calculator::with_seed(1);
        type_in(&mut calc, "99*2");
        assert_eq!(calc.press_equals(), Equals::Value("198".into()));
        assert_eq!(calc.display(), "198");
        assert_eq!(calc.history()[0], "99*2 = 198");
    }

    #[test]
    fn division_by_zero_is_an_error_without_history() {
        let mut calc = Calculator::with_seed(2);
        let before = calc.history().to_vec();
        type_in(&mut calc, "5/0");
        assert_eq!(calc.press_equals(), Equals::Error);
        assert_eq!(calc.display(), "Error");
        assert_eq!(calc.history(), &before[..]);
    }

    #[test]
    fn empty_display_is_an_error() {
        let mut calc = Calculator::with_seed(3);
        assert_eq!(calc.press_equals(), Equals::Error);
    }

    #[test]
    fn triggers_launch_instead_of_evaluating() {
        let mut calc = Calculator::with_seed(4);
        type_in(&mut calc, "1+1");
        assert_eq!(calc.press_equals(), Equals::Launch(GameId::Snake));
        assert_eq!(calc.display(), "1+1");

        calc.clear();
        type_in(&mut calc, "2048");
        assert_eq!(calc.press_equals(), Equals::Launch(GameId::Twenty48));

        calc.clear();
        type_in(&mut calc, "7+7");
        assert_eq!(calc.press_equals(), Equals::Value("14".into()));
    }

    #[test]
    fn history_is_capped() {
        let mut calc = Calculator::with_seed(5);
        for i in 0..30 {
            calc.clear();
            type_in(&mut calc, &format!("{}+0", i));
            calc.press_equals();
        }
        assert_eq!(calc.history().len(), HISTORY_CAP);
        assert_eq!(calc.history()[0], "29+0 = 29");
        assert_eq!(calc.history()[HISTORY_CAP - 1], "10+0 = 10");
    }

    #[test]
    fn only_one_decimal_point_per_display() {
        let mut calc = Calculator::with_seed(6);
        assert!(calc.input('1'));
        assert!(calc.input('.'));
        assert!(!calc.input('.'));
        assert!(calc.input('+'));
        assert!(!calc.input('.'));
        assert!(!calc.input('x'));
        assert_eq!(calc.display(), "1.+");
    }

    #[test]
    fn recall_loads_the_left_hand_side() {
        let mut calc = Calculator::with_seed(7);
        assert_eq!(calc.history()[0], "(88 - 14) / 2 = 37");
        calc.recall(0);
        assert_eq!(calc.display(), "(88 - 14) / 2");
        calc.recall(99);
        assert_eq!(calc.display(), "(88 - 14) / 2");
    }

    #[test]
    fn returning_from_a_game_camouflages_the_calculator() {
        let mut calc = Calculator::with_seed(8);
        type_in(&mut calc, "3*3");
        calc.press_equals();
        calc.on_return();
        assert!(HARD_EXPRESSIONS.contains(&calc.display()));
        assert_eq!(calc.history().len(), FAKE_HISTORY.len());
        assert!(!calc.history().iter().any(|h| h.starts_with("3*3")));
        assert!(!calc.guidance_available());
    }

    #[test]
    fn guidance_toggles_until_the_first_launch() {
        let mut calc = Calculator::with_seed(9);
        assert!(!calc.guidance_open());
        calc.toggle_guidance();
        assert!(calc.guidance_open());
        calc.on_game_launched();
        assert!(!calc.guidance_open());
        calc.toggle_guidance();
        assert!(!calc.guidance_open());
    }

    #[test]
    fn keypad_buttons_mirror_the_keyboard() {
        let mut calc = Calculator::with_seed(10);
        for label in ["4", "+", "4"] {
            assert_eq!(calc.press_button(label), Action::None);
        }
        assert_eq!(calc.press_button("="), Action::Launch(GameId::MemoryMatch));
        calc.press_button("C");
        assert_eq!(calc.display(), "");
    }

    #[test]
    fn keys_route_to_actions() {
        let mut calc = Calculator::with_seed(11);
        let key = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
        calc.handle_key(key('6'));
        calc.handle_key(key('+'));
        calc.handle_key(key('6'));
        assert_eq!(
            calc.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            Action::Launch(GameId::ColorReaction)
        );
        assert_eq!(calc.handle_key(key('q')), Action::Quit);
        calc.handle_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(calc.display(), "6+");
    }
}
