use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use sortie_core::types::{RunState, RunStatus};
use crate::App;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log_visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(f.area())
    } else {
        Layout::default()
            .constraints([Constraint::Percentage(100)])
            .split(f.area())
    };

    // snapshot so the runner thread never waits on rendering
    let status = app.status.lock().map(|s| s.clone()).unwrap_or_default();
    draw_status(f, &status, chunks[0]);

    if app.log_visible && chunks.len() > 1 {
        draw_log(f, app, chunks[1]);
    }
    if let Some(dialog) = &app.confirm {
        dialog.render(f);
    }
}

fn banner(state: RunState) -> (&'static str, Color) {
    match state {
        RunState::Running => ("RUNNING (S to stop)", Color::Green),
        RunState::Stopping => ("STOPPING...", Color::Yellow),
        RunState::Stopped => ("STOPPED (Q to quit)", Color::Blue),
        RunState::Failed => ("FAILED (see log)", Color::Red),
    }
}

fn field<'a>(name: &'a str, value: String, color: Color) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!(" {:<11}", name), Style::default().fg(Color::DarkGray)),
        Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
    ])
}

fn draw_status(f: &mut Frame, status: &RunStatus, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let (label, bg) = banner(status.state);
    let width = rows[0].width as usize;
    let pad_left = width.saturating_sub(label.len()) / 2;
    let pad_right = width.saturating_sub(label.len() + pad_left);
    let centered = format!("{}{}{}", " ".repeat(pad_left), label, " ".repeat(pad_right));
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            centered,
            Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD),
        ))),
        rows[0],
    );

    let phase = status.phase.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
    let retry_color = if status.recoveries == 0 {
        Color::Green
    } else if status.recoveries < status.retry_limit {
        Color::Yellow
    } else {
        Color::Red
    };

    let mut lines = vec![
        Line::from(""),
        field("flow", status.flow.to_string(), Color::White),
        field("mode", status.mode.to_string(), Color::Cyan),
        field("phase", phase, Color::Cyan),
        field("cycles", status.cycles.to_string(), Color::White),
        field("recoveries", format!("{}/{}", status.recoveries, status.retry_limit), retry_color),
        Line::from(""),
    ];
    if let Some(err) = &status.last_error {
        lines.push(Line::from(Span::styled(" last error", Style::default().fg(Color::DarkGray))));
        lines.push(Line::from(Span::styled(format!(" {}", err), Style::default().fg(Color::Red))));
    }

    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(panel, rows[1]);
}

fn draw_log(f: &mut Frame, app: &App, area: Rect) {
    let visible_height = area.height.saturating_sub(2) as usize;
    let total = app.log_messages.len();
    let scroll = app.log_scroll.min(total.saturating_sub(visible_height));
    let start = total.saturating_sub(visible_height + scroll);
    let end = total.saturating_sub(scroll);
    let lines: Vec<Line> = app.log_messages[start..end].iter().map(|m| parse_log_line(m)).collect();

    let title = if scroll > 0 { format!(" Log (+{}) ", scroll) } else { " Log ".to_string() };
    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(panel, area);
}

/// Render one structured log line (level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage).
fn parse_log_line(raw: &str) -> Line<'_> {
    let parts: Vec<&str> = raw.splitn(5, '\x1f').collect();
    let [level, prefix, color, timestamp, message] = parts[..] else {
        return Line::from(raw);
    };

    let color = match color.parse::<u8>().unwrap_or(0) {
        1 => Color::DarkGray,
        2 => Color::LightBlue,
        3 => Color::LightGreen,
        4 => Color::LightMagenta,
        _ => Color::White,
    };

    let mut spans = vec![Span::styled(timestamp, Style::default().fg(Color::DarkGray)), Span::raw(" ")];
    match level {
        "ERROR" => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        "WARN" => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        _ => {}
    }
    if !prefix.is_empty() {
        spans.push(Span::styled(prefix, Style::default().fg(color).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(message, Style::default().fg(color)));
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_line_gets_prefix_and_level() {
        let line = parse_log_line("WARN\x1fpoll\x1f1\x1f12:00:01\x1fmenu: gave up after 60 attempts");
        let text: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, ["12:00:01", " ", "warn ", "poll", " ", "menu: gave up after 60 attempts"]);
    }

    #[test]
    fn plain_line_passes_through() {
        let line = parse_log_line("hello");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "hello");
    }
}
