use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::app::App;
use crate::controller::Focus;
use crate::state::{Sender, TranscriptEntry};

// Rows drawn under the transcript while a reply is pending
const THINKING_LINES: u16 = 2;

fn sender_style(sender: Sender) -> Style {
    let color = match sender {
        Sender::User => Color::Cyan,
        Sender::Assistant => Color::Yellow,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Split a line on `**` markers, alternating plain and bold spans.
/// An unmatched trailing `**` is kept as literal text.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    let closed = parts.len() % 2 == 1;

    let mut spans: Vec<Span<'static>> = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        let is_last = i == parts.len() - 1;
        if i % 2 == 1 && (closed || !is_last) {
            if !part.is_empty() {
                spans.push(Span::styled(
                    part.to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            }
        } else if i % 2 == 1 {
            spans.push(Span::raw(format!("**{}", part)));
        } else if !part.is_empty() {
            spans.push(Span::raw(part.to_string()));
        }
    }

    Line::from(spans)
}

/// The lines one transcript entry renders to: sender label, text, blank separator.
pub fn entry_lines(entry: &TranscriptEntry) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        entry.sender.label(),
        sender_style(entry.sender),
    ))];
    for line in entry.text.lines() {
        match entry.sender {
            Sender::User => lines.push(Line::from(line.to_string())),
            Sender::Assistant => lines.push(parse_markdown_line(line)),
        }
    }
    lines.push(Line::default());
    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, input_row, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, body_area);
    render_input(app, frame, input_row);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mode = if app.controller.is_prompt_waiting() {
        Span::styled(" [answering] ", Style::default().fg(Color::Magenta))
    } else {
        Span::raw("")
    };

    let title = Line::from(vec![
        Span::styled(format!(" {} ", app.title), Style::default().fg(Color::Cyan).bold()),
        mode,
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(title).style(Style::default().bg(Color::Black)), area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    app.transcript_area = Some(area);

    let waiting = app.is_waiting();
    let trailing = if waiting { THINKING_LINES } else { 0 };

    // Inner size minus borders
    app.controller.transcript_mut().set_viewport(
        area.width.saturating_sub(2),
        area.height.saturating_sub(2),
        trailing,
    );

    let focused = app.controller.focus() == Focus::Transcript;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(format!(" Chat ({}) ", app.controller.transcript().len() - 1));

    let transcript = app.controller.transcript();
    let mut lines: Vec<Line> = transcript.entries().iter().flat_map(entry_lines).collect();

    if waiting {
        lines.push(Line::from(Span::styled(
            Sender::Assistant.label(),
            sender_style(Sender::Assistant),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let scroll = transcript.scroll;
    let total = transcript.total_lines();
    let view_height = area.height.saturating_sub(2);

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(chat, area);

    if total > view_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None);
        let mut scrollbar_state = ScrollbarState::new(total.saturating_sub(view_height) as usize)
            .position(scroll as usize);
        frame.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, send_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(10)]).areas(area);
    app.send_area = Some(send_area);

    let gate = app.controller.gate();
    let field = gate.field();
    let disabled = field.is_disabled();
    let focused = app.controller.focus() == Focus::Input;

    let border_color = if disabled {
        Color::DarkGray
    } else if focused {
        Color::Yellow
    } else {
        Color::Gray
    };
    let title = if app.controller.is_prompt_waiting() {
        " Answer "
    } else {
        " Message "
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor visible
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = field.cursor();
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };
    let visible_text: String = field
        .value()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_style = if disabled {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    frame.render_widget(
        Paragraph::new(visible_text).style(text_style).block(input_block),
        input_area,
    );

    let send_style = if gate.send_button().is_disabled() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    };
    let send = Paragraph::new(Line::from(Span::styled("Send", send_style)).centered())
        .block(Block::default().borders(Borders::ALL).border_style(send_style));
    frame.render_widget(send, send_area);

    if focused && !disabled {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hint = match app.controller.focus() {
        Focus::Input => " Enter send · Tab focus chat · Ctrl-L clear · Esc quit ",
        Focus::Transcript => " ↑/↓ PgUp/PgDn scroll · End latest · Tab focus input · Esc quit ",
    };
    let mut spans = vec![Span::styled(hint, Style::default().fg(Color::DarkGray))];
    if !app.controller.transcript().is_pinned() {
        spans.push(Span::styled(" [scrolled up] ", Style::default().fg(Color::Magenta)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
