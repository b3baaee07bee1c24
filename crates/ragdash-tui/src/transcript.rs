//! Projection of the conversation into terminal lines.
//!
//! User turns are right-aligned, assistant turns left-aligned. Citations are
//! listed under the answer that carries them, in the order received.

use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use ragdash_core::{ChatRole, Message};

const USER_COLOR: Color = Color::Cyan;
const ASSISTANT_COLOR: Color = Color::Yellow;

pub fn transcript_lines(messages: &[Message], pending: bool, animation_frame: u8) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in messages {
        match msg.role {
            ChatRole::User => {
                lines.push(
                    Line::from(Span::styled(
                        "You",
                        Style::default().fg(USER_COLOR).add_modifier(Modifier::BOLD),
                    ))
                    .alignment(Alignment::Right),
                );
                for text in msg.content.lines() {
                    lines.push(
                        Line::from(Span::styled(text.to_string(), Style::default().fg(USER_COLOR)))
                            .alignment(Alignment::Right),
                    );
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Assistant",
                    Style::default().fg(ASSISTANT_COLOR).add_modifier(Modifier::BOLD),
                )));
                for text in msg.content.lines() {
                    lines.push(styled_answer_line(text));
                }

                let citations = msg.citations();
                if !citations.is_empty() {
                    lines.push(Line::from(Span::styled(
                        "Sources",
                        Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC),
                    )));
                    for citation in citations {
                        lines.push(Line::from(vec![
                            Span::styled("  ", Style::default()),
                            Span::styled(citation.to_string(), Style::default().fg(Color::Magenta)),
                        ]));
                    }
                }
            }
        }
        lines.push(Line::default());
    }

    if pending {
        lines.push(Line::from(Span::styled(
            "Assistant",
            Style::default().fg(ASSISTANT_COLOR).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize % 3) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// Rows `lines` occupy once wrapped at `width` columns
pub fn wrapped_height(lines: &[Line<'_>], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let rows: usize = lines
        .iter()
        .map(|line| {
            let chars = line.width();
            if chars == 0 {
                1
            } else {
                chars.div_ceil(width)
            }
        })
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

/// Style `**bold**` and `` `code` `` spans in an answer line. Unclosed markers
/// are kept as literal text.
fn styled_answer_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        let marker = if rest.starts_with("**") {
            Some(("**", Style::default().add_modifier(Modifier::BOLD)))
        } else if rest.starts_with('`') {
            Some(("`", Style::default().fg(Color::Green)))
        } else {
            None
        };

        if let Some((delim, style)) = marker {
            let inner = &rest[delim.len()..];
            if let Some(end) = inner.find(delim).filter(|&end| end > 0) {
                if !plain.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut plain)));
                }
                spans.push(Span::styled(inner[..end].to_string(), style));
                rest = &inner[end + delim.len()..];
                continue;
            }
            plain.push_str(delim);
            rest = inner;
            continue;
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            plain.push(c);
        }
        rest = chars.as_str();
    }

    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }

    Line::from(spans)
}
