//! Markdown-ish rendering of chat messages into terminal text.
//!
//! Handles `**bold**`, `` `inline code` `` and fenced code blocks. Rendering
//! is fallible: text that would smuggle terminal control sequences into the
//! panel is rejected, and the caller shows a fixed notice instead.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use thiserror::Error;

pub const RENDER_FAILED_NOTICE: &str = "⚠️ This message could not be displayed.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("control character U+{0:04X} in message")]
    ControlSequence(u32),
}

fn code_style() -> Style {
    Style::default().fg(Color::Green)
}

/// Lines to draw for a finished message. A message that fails to render is
/// replaced by `RENDER_FAILED_NOTICE`, never the whole view.
pub fn render_or_notice(content: &str) -> Vec<Line<'static>> {
    match render_message(content) {
        Ok(lines) => lines,
        Err(_) => vec![Line::from(Span::styled(
            RENDER_FAILED_NOTICE,
            Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
        ))],
    }
}

/// Render a whole message into lines.
pub fn render_message(content: &str) -> Result<Vec<Line<'static>>, RenderError> {
    if let Some(c) = content
        .chars()
        .find(|c| c.is_control() && *c != '\n' && *c != '\t' && *c != '\r')
    {
        return Err(RenderError::ControlSequence(c as u32));
    }

    let mut lines = Vec::new();
    let mut in_code_block = false;

    for raw in content.lines() {
        let line = raw.replace('\t', "    ");
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            let lang = line.trim_start().trim_start_matches('`').trim();
            let label = if in_code_block && !lang.is_empty() {
                format!("── {} ──", lang)
            } else {
                "────".to_string()
            };
            lines.push(Line::from(Span::styled(label, Style::default().fg(Color::DarkGray))));
            continue;
        }

        if in_code_block {
            lines.push(Line::from(Span::styled(line, code_style())));
        } else {
            lines.push(parse_markdown_line(&line));
        }
    }

    Ok(lines)
}

/// Parse a line of text and convert **bold** and `code` spans to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();

                let mut bold_text = String::new();
                let mut found_close = false;
                while let Some(c) = chars.next() {
                    if c == '*' && chars.peek() == Some(&'*') {
                        chars.next();
                        found_close = true;
                        break;
                    }
                    bold_text.push(c);
                }

                if found_close && !bold_text.is_empty() {
                    if !current_text.is_empty() {
                        spans.push(Span::raw(std::mem::take(&mut current_text)));
                    }
                    spans.push(Span::styled(
                        bold_text,
                        Style::default().add_modifier(Modifier::BOLD),
                    ));
                } else {
                    // No closing **, treat as literal
                    current_text.push_str("**");
                    current_text.push_str(&bold_text);
                }
            }
            '`' => {
                let mut code_text = String::new();
                let mut found_close = false;
                for c in chars.by_ref() {
                    if c == '`' {
                        found_close = true;
                        break;
                    }
                    code_text.push(c);
                }

                if found_close && !code_text.is_empty() {
                    if !current_text.is_empty() {
                        spans.push(Span::raw(std::mem::take(&mut current_text)));
                    }
                    spans.push(Span::styled(code_text, code_style()));
                } else {
                    current_text.push('`');
                    current_text.push_str(&code_text);
                    if found_close {
                        current_text.push('`');
                    }
                }
            }
            _ => current_text.push(c),
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_or_notice_replaces_only_bad_message() {
        let bad = render_or_notice("hi\x1b[2Jthere");
        assert_eq!(bad.len(), 1);
        assert_eq!(plain(&bad[0]), RENDER_FAILED_NOTICE);

        let good = render_or_notice("line one\nline two");
        assert_eq!(good.len(), 2);
    }

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_bold_and_code_spans() {
        let line = parse_markdown_line("use **this** or `that`");
        assert_eq!(line.spans.len(), 4);
        assert_eq!(line.spans[1].content, "this");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(line.spans[3].content, "that");
        assert_eq!(plain(&line), "use this or that");
    }

    #[test]
    fn test_unclosed_markers_are_literal() {
        assert_eq!(plain(&parse_markdown_line("a **b")), "a **b");
        assert_eq!(plain(&parse_markdown_line("a `b")), "a `b");
    }

    #[test]
    fn test_code_block_lines_are_not_parsed() {
        let lines = render_message("Update `foo.py`:\n```py\nx = **y**\n```").unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(plain(&lines[1]), "── py ──");
        assert_eq!(plain(&lines[2]), "x = **y**");
        assert_eq!(plain(&lines[3]), "────");
    }

    #[test]
    fn test_escape_sequence_rejected() {
        assert_eq!(
            render_message("evil \u{1b}[2J"),
            Err(RenderError::ControlSequence(0x1b))
        );
    }
}
