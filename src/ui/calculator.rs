use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::{App, CalculatorHits};
use crate::calculator::{Calculator, ERROR_TEXT, KEYPAD};
use crate::games::GameId;

const BUTTON_W: u16 = 8;
const BUTTON_H: u16 = 3;
const PANEL_W: u16 = BUTTON_W * 4 + 2;

const FRAME_COLOR: Color = Color::Rgb(70, 90, 120);
const DIM: Color = Color::Rgb(110, 110, 130);

fn button_color(label: &str) -> Color {
    match label {
        "=" => Color::Rgb(255, 149, 0),
        "C" => Color::Rgb(220, 80, 80),
        "+" | "-" | "*" | "/" | "%" | "(" | ")" => Color::Rgb(100, 180, 255),
        _ => Color::Rgb(225, 225, 235),
    }
}

pub fn render_calculator(frame: &mut Frame, area: Rect, app: &mut App) {
    let mut hits = CalculatorHits::default();

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(PANEL_W), Constraint::Min(20)])
        .split(area);

    render_panel(frame, columns[0], &app.calculator, &mut hits);

    let right = if app.calculator.guidance_available() {
        let guide_h = if app.calculator.guidance_open() { GameId::ALL.len() as u16 + 5 } else { 3 };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(4), Constraint::Length(guide_h)])
            .split(columns[1]);
        render_guidance(frame, rows[1], &app.calculator, &mut hits);
        rows[0]
    } else {
        columns[1]
    };
    render_history(frame, right, &app.calculator, &mut hits);

    app.hits = hits;
}

fn render_panel(frame: &mut Frame, area: Rect, calc: &Calculator, hits: &mut CalculatorHits) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(FRAME_COLOR));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(BUTTON_H * KEYPAD.len() as u16), Constraint::Min(0)])
        .split(inner);

    let text_color = if calc.display() == ERROR_TEXT {
        Color::Rgb(255, 90, 90)
    } else {
        Color::White
    };
    let shown = if calc.display().is_empty() { "0" } else { calc.display() };
    let display = Paragraph::new(Span::styled(
        shown.to_string(),
        Style::default().fg(text_color).add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Right)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Rgb(90, 110, 140)))
            .style(Style::default().bg(Color::Rgb(20, 24, 32))),
    );
    frame.render_widget(display, rows[0]);

    let pad = rows[1];
    for (r, row) in KEYPAD.iter().enumerate() {
        for (c, &label) in row.iter().enumerate() {
            let rect = Rect {
                x: pad.x + c as u16 * BUTTON_W,
                y: pad.y + r as u16 * BUTTON_H,
                width: BUTTON_W,
                height: BUTTON_H,
            };
            if rect.right() > pad.right() || rect.bottom() > pad.bottom() {
                continue;
            }
            let color = button_color(label);
            let button = Paragraph::new(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(Color::Rgb(60, 60, 80))),
            );
            frame.render_widget(button, rect);
            hits.keypad.push((rect, label));
        }
    }

    let hint = Paragraph::new(Line::from(vec![
        Span::styled("Enter", Style::default().fg(Color::Rgb(80, 200, 255))),
        Span::styled(" = ", Style::default().fg(DIM)),
        Span::styled("Esc", Style::default().fg(Color::Rgb(80, 200, 255))),
        Span::styled(" clear ", Style::default().fg(DIM)),
        Span::styled("Q", Style::default().fg(Color::Rgb(80, 200, 255))),
        Span::styled(" quit", Style::default().fg(DIM)),
    ]))
    .alignment(Alignment::Center);
    frame.render_widget(hint, rows[2]);
}

fn render_history(frame: &mut Frame, area: Rect, calc: &Calculator, hits: &mut CalculatorHits) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(FRAME_COLOR))
        .title(" History ")
        .title_style(Style::default().fg(Color::Rgb(180, 180, 200)).add_modifier(Modifier::BOLD));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    for (i, entry) in calc.history().iter().enumerate().take(inner.height as usize) {
        let rect = Rect {
            x: inner.x,
            y: inner.y + i as u16,
            width: inner.width,
            height: 1,
        };
        let style = if i == 0 {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::Rgb(150, 150, 170))
        };
        frame.render_widget(Paragraph::new(Span::styled(format!(" {}", entry), style)), rect);
        hits.history.push((rect, i));
    }
}

fn render_guidance(frame: &mut Frame, area: Rect, calc: &Calculator, hits: &mut CalculatorHits) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(60, 60, 80)));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return;
    }

    let toggle = Rect { height: 1, ..inner };
    let label = if calc.guidance_open() { "▾ Hide Guidance (G)" } else { "▸ Show Guidance (G)" };
    frame.render_widget(
        Paragraph::new(Span::styled(label, Style::default().fg(Color::Rgb(255, 220, 80)))),
        toggle,
    );
    hits.guidance_toggle = Some(toggle);

    if !calc.guidance_open() {
        return;
    }
    let mut lines: Vec<Line> = GameId::ALL
        .iter()
        .map(|id| {
            Line::from(vec![
                Span::styled(format!("  {:<8}", id.guidance()), Style::default().fg(Color::Rgb(80, 200, 255))),
                Span::styled("→ ", Style::default().fg(DIM)),
                Span::styled(format!("{} {}", id.icon(), id.title()), Style::default().fg(id.color())),
            ])
        })
        .collect();
    lines.push(Line::from(Span::styled(
        "  Alt+CapsLock returns here",
        Style::default().fg(DIM),
    )));
    let list = Rect {
        y: inner.y + 1,
        height: inner.height - 1,
        ..inner
    };
    frame.render_widget(Paragraph::new(lines), list);
}
