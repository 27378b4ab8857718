pub mod calculator;
pub mod header;

use ratatui::prelude::*;

use crate::app::{App, View};

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Calculator or game
        ])
        .split(frame.area());

    header::render_header(frame, app, chunks[0]);

    match app.view() {
        View::Calculator => calculator::render_calculator(frame, chunks[1], app),
        View::Game(_) => {
            if let Some(game) = app.game_mut() {
                game.render(frame, chunks[1]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossterm::event::{KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use crate::calculator::Calculator;
    use crate::games::GameId;

    fn draw(app: &mut App, width: u16, height: u16) {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
    }

    #[test]
    fn calculator_view_records_clickable_regions() {
        let mut app = App::with_calculator(Calculator::with_seed(1));
        app.calculator.toggle_guidance();
        draw(&mut app, 100, 40);
        assert_eq!(app.hits.keypad.len(), 20);
        assert_eq!(app.hits.history.len(), 3);
        assert!(app.hits.guidance_toggle.is_some());
    }

    fn click_button(app: &mut App, label: &str) {
        let (rect, _) = *app.hits.keypad.iter().find(|(_, l)| *l == label).unwrap();
        app.on_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: rect.x + rect.width / 2,
            row: rect.y + rect.height / 2,
            modifiers: KeyModifiers::NONE,
        });
    }

    #[test]
    fn rendered_keypad_and_history_respond_to_clicks() {
        let mut app = App::with_calculator(Calculator::with_seed(3));
        draw(&mut app, 100, 40);
        for label in ["9", "*", "3", "="] {
            click_button(&mut app, label);
        }
        assert_eq!(app.calculator.display(), "27");

        draw(&mut app, 100, 40);
        let (row, index) = app.hits.history[1];
        app.on_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: row.x + 1,
            row: row.y,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(app.calculator.display(), "(88 - 14) / 2");
        assert_eq!(index, 1);

        click_button(&mut app, "C");
        for label in ["2", "+", "2", "="] {
            click_button(&mut app, label);
        }
        assert_eq!(app.view(), View::Game(GameId::Pong));
    }

    #[test]
    fn every_game_draws_at_any_size() {
        for id in GameId::ALL {
            let mut app = App::with_calculator(Calculator::with_seed(2));
            app.launch(id);
            for (w, h) in [(120, 45), (80, 24), (24, 8), (0, 0)] {
                app.advance(Duration::from_millis(250));
                draw(&mut app, w.max(1), h.max(1));
            }
        }
    }
}
