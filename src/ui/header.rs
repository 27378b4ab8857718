use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::{App, View};

pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let (title, color, hint) = match app.view() {
        View::Calculator => (" 🧮 Calculator ".to_string(), Color::Rgb(60, 150, 200), "G guidance │ Q quit"),
        View::Game(id) => (
            format!(" {} {} ", id.icon(), id.title()),
            id.color(),
            "Alt+CapsLock / Esc  ← Calculator │ Ctrl+C quit",
        ),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .border_type(BorderType::Rounded)
        .title(title)
        .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD));
    let bar = Paragraph::new(Span::styled(hint, Style::default().fg(Color::Rgb(120, 120, 140))))
        .alignment(Alignment::Right)
        .block(block);

    frame.render_widget(bar, area);
}
