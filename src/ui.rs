use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use codechat::markdown;
use codechat::session::{ChatRole, PendingStage};
use crate::app::App;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let follow_up_height = match app.controller.follow_ups().len() {
        0 if app.controller.follow_ups_pending() => 3,
        0 => 0,
        n => (n.min(3) + 2) as u16,
    };

    // Main layout: header, chat, follow-ups, input, footer
    let [header_area, chat_area, follow_up_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(follow_up_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    if follow_up_height > 0 {
        render_follow_ups(app, frame, follow_up_area);
    }
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" AI Chat Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!(" {} ", app.model), Style::default().fg(Color::Yellow)),
        Span::styled(format!(" {} ", app.workspace_label), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn pending_label(stage: &PendingStage) -> String {
    match stage {
        PendingStage::Thinking => "Thinking".to_string(),
        PendingStage::ReadingFile(path) => format!("Reading {}", path),
        PendingStage::ProcessingFile(path) => format!("Processing {} with Gemini", path),
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Inner size, used by App::scroll_to_bottom
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Chat ");

    let mut lines: Vec<Line> = Vec::new();

    for msg in app.controller.transcript() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.extend(markdown::render_or_notice(&msg.content));
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                if let Some(stage) = msg.pending_stage() {
                    // Animated ellipsis: cycles through ".", "..", "..."
                    let dots = ".".repeat((app.animation_frame as usize) + 1);
                    lines.push(Line::from(Span::styled(
                        format!("{}{}", pending_label(stage), dots),
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                } else {
                    lines.extend(markdown::render_or_notice(&msg.content));
                }
            }
        }
        lines.push(Line::default());
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_follow_ups(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" 💡 Suggested Follow-ups (Tab) ");

    let follow_ups = app.controller.follow_ups();
    let lines: Vec<Line> = if follow_ups.is_empty() {
        vec![Line::from(Span::styled(
            "Generating follow-up suggestions...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))]
    } else {
        follow_ups
            .iter()
            .take(3)
            .enumerate()
            .map(|(i, q)| {
                let style = if app.follow_up_idx == Some(i) {
                    Style::default().bg(Color::Magenta).fg(Color::White)
                } else {
                    Style::default()
                };
                Line::from(Span::styled(format!(" {}. {} ", i + 1, q), style))
            })
            .collect()
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let busy = app.controller.is_busy();
    let border_color = if busy { Color::DarkGray } else { Color::Yellow };

    let title = match &app.attachment {
        Some(attachment) => format!(" Ask  [🖼️ {}] ", attachment.label),
        None => " Ask ".to_string(),
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let width = area.width.saturating_sub(2) as usize;
    let offset = input_offset(app.cursor, width);
    let visible: String = app.input.chars().skip(offset).take(width).collect();

    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    let cursor_x = (app.cursor - offset) as u16;
    frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
}

/// First visible char of the input box, so the cursor stays in view.
fn input_offset(cursor: usize, width: usize) -> usize {
    if width == 0 {
        0
    } else {
        (cursor + 1).saturating_sub(width)
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let content = match &app.notice {
        Some(notice) => Line::from(Span::styled(format!(" {} ", notice), Style::default().fg(Color::Yellow))),
        None => Line::from(vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" @file ", key_style),
            Span::styled(" attach ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" follow-up ", label_style),
            Span::styled(" ↑/↓ ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" /help ", key_style),
            Span::styled(" commands ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" quit ", label_style),
        ]),
    };

    let footer = Paragraph::new(content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
