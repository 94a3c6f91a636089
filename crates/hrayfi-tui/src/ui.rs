use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use hrayfi_core::persona::ASSISTANT_TITLE;
use unicode_width::UnicodeWidthChar;
use hrayfi_core::Role;
use crate::app::App;

const PANEL_WIDTH: u16 = 48;
const PANEL_HEIGHT: u16 = 20;
const BUTTON_WIDTH: u16 = 10;
const BUTTON_HEIGHT: u16 = 3;
/// Gap between the floating widget and the bottom-right corner.
const MARGIN: u16 = 1;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        if end == 0 {
            // "****" is literal text
            spans.push(Span::raw(rest[..start + 4].to_string()));
            rest = &after[2..];
            continue;
        }
        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(
            after[..end].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after[end + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Anchor a `width` x `height` box to the bottom-right corner of `area`.
fn bottom_right(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(MARGIN));
    let height = height.min(area.height.saturating_sub(MARGIN));
    let x = area.x + area.width.saturating_sub(width + MARGIN);
    let y = area.y + area.height.saturating_sub(height + MARGIN);
    Rect::new(x, y, width, height)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);
    render_storefront(frame, body_area);
    render_footer(app, frame, footer_area);

    if app.session.is_open() {
        app.button_area = None;
        render_panel(app, frame, body_area);
    } else {
        app.panel_area = None;
        render_button(app, frame, body_area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Hrayfi ", Style::default().fg(Color::Yellow).bold()),
        Span::styled("Moroccan artisan marketplace", Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Page content the floating widget sits on top of.
fn render_storefront(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::default(),
        Line::from(" Handwoven Berber rugs, Fez ceramics, Safi pottery, brass lanterns,"),
        Line::from(" argan oil and leather goods from cooperatives across Morocco."),
        Line::default(),
        Line::from(Span::styled(
            " Questions about a product? Open the assistant in the corner.",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let disabled_style = Style::default().bg(Color::Black).fg(Color::DarkGray);

    let hints = if app.session.is_open() {
        let send_style = if app.session.can_send() {
            label_style
        } else {
            disabled_style
        };
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", send_style),
            Span::styled(" ↑/↓ ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
        ]
    } else {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" chat ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ]
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_button(app: &mut App, frame: &mut Frame, area: Rect) {
    let button_area = bottom_right(area, BUTTON_WIDTH, BUTTON_HEIGHT);
    app.button_area = Some(button_area);

    let button = Paragraph::new(Line::from(" Chat ".bold()))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Black).bg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(Clear, button_area);
    frame.render_widget(button, button_area);
}

fn render_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    let panel_area = bottom_right(area, PANEL_WIDTH, PANEL_HEIGHT);
    app.panel_area = Some(panel_area);

    frame.render_widget(Clear, panel_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title_top(Line::from(format!(" {} ", ASSISTANT_TITLE.to_uppercase())).bold())
        .title_top(Line::from("[x]").right_aligned());
    let inner = block.inner(panel_area);
    frame.render_widget(block, panel_area);

    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(inner);

    app.chat_height = chat_area.height;
    app.chat_width = chat_area.width;

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
}

/// The chat transcript as a wrapped paragraph. Rendering and scroll limits
/// both go through here so they agree on the wrapped height.
pub fn chat_paragraph(app: &App) -> Paragraph<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.session.messages() {
        match msg.role {
            Role::User => {
                lines.push(
                    Line::from(Span::styled(
                        "You",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ))
                    .right_aligned(),
                );
                for line in msg.text.lines() {
                    lines.push(Line::from(line.to_string()).cyan().right_aligned());
                }
            }
            Role::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Assistant",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.session.is_loading() {
        lines.push(Line::from(Span::styled(
            "Assistant",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Assistant is thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true })
}

fn render_chat(app: &App, frame: &mut Frame, area: Rect) {
    let chat = chat_paragraph(app).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

/// Slice of the input that fits in `width` columns with the cursor in view,
/// plus the cursor's column inside that slice. Measured in display width.
fn visible_input(input: &str, cursor: usize, width: usize) -> (String, u16) {
    let chars: Vec<char> = input.chars().collect();
    let cursor = cursor.min(chars.len());
    let char_width = |c: char| c.width().unwrap_or(0);

    // Drop characters off the left until the cursor fits
    let mut offset = 0;
    let mut cursor_col: usize = chars[..cursor].iter().map(|&c| char_width(c)).sum();
    while width > 0 && cursor_col >= width && offset < cursor {
        cursor_col -= char_width(chars[offset]);
        offset += 1;
    }

    let mut visible = String::new();
    let mut used = 0;
    for &c in &chars[offset..] {
        let w = char_width(c);
        if used + w > width {
            break;
        }
        used += w;
        visible.push(c);
    }

    (visible, u16::try_from(cursor_col).unwrap_or(u16::MAX))
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let loading = app.session.is_loading();
    let border_color = if loading { Color::DarkGray } else { Color::Yellow };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) =
        visible_input(app.session.input(), app.input_cursor, inner_width);

    let input = if app.session.input().is_empty() {
        Paragraph::new(Span::styled(
            "Type your message...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let style = if loading {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Cyan)
        };
        Paragraph::new(visible_text).style(style)
    };

    frame.render_widget(input.block(block), area);

    if !loading {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::echo_app;
    use hrayfi_core::SubmitOutcome;
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();

        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("Try **Fez** pottery");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "Fez");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_parse_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("a **b");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "a **b");
    }

    #[test]
    fn test_visible_input_ascii() {
        assert_eq!(visible_input("hi", 1, 10), ("hi".to_string(), 1));
        assert_eq!(visible_input("abcdef", 6, 4), ("def".to_string(), 3));
    }

    #[test]
    fn test_visible_input_wide_glyphs() {
        assert_eq!(visible_input("日本語", 3, 20), ("日本語".to_string(), 6));
        assert_eq!(visible_input("日本語です", 5, 6), ("です".to_string(), 4));
        assert_eq!(visible_input("a🏺b", 2, 10), ("a🏺b".to_string(), 3));
    }

    #[test]
    fn test_bottom_right_clamps_to_area() {
        let area = Rect::new(0, 1, 30, 10);
        let rect = bottom_right(area, PANEL_WIDTH, PANEL_HEIGHT);
        assert_eq!(rect, Rect::new(0, 1, 29, 9));

        let rect = bottom_right(Rect::new(0, 1, 100, 28), BUTTON_WIDTH, BUTTON_HEIGHT);
        assert_eq!(rect, Rect::new(89, 25, 10, 3));
    }

    #[test]
    fn test_closed_shows_button_only() {
        let mut app = echo_app();
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("Chat"));
        assert!(!screen.contains("HRAYFI ASSISTANT"));
        assert!(app.button_area.is_some());
        assert!(app.panel_area.is_none());
    }

    #[test]
    fn test_open_panel_shows_welcome_and_placeholder() {
        let mut app = echo_app();
        app.open_panel();
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("HRAYFI ASSISTANT"));
        assert!(screen.contains("Hello! I am the"));
        assert!(screen.contains("Type your message..."));
        assert!(app.panel_area.is_some());
        assert!(app.button_area.is_none());
    }

    #[test]
    fn test_wrapped_reply_scrolls_fully_into_view() {
        let mut app = echo_app();
        app.open_panel();
        let pending = match app.session.begin_submit("Hello") {
            SubmitOutcome::Dispatched(pending) => pending,
            SubmitOutcome::Rejected(r) => panic!("expected dispatch, got {r:?}"),
        };
        let paragraph = format!("{} {} {}\n", "a".repeat(30), "b".repeat(30), "c".repeat(30));
        let reply = format!("{}ENDMARKER", paragraph.repeat(5));
        app.session.finish(pending, Ok(Some(reply)));

        // The first pass records the chat size
        draw(&mut app, 100, 30);
        app.scroll_chat_to_bottom();
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("ENDMARKER"));

        let wrapped = chat_paragraph(&app).line_count(app.chat_width);
        assert_eq!(app.chat_line_count() as usize, wrapped);
        assert_eq!(app.chat_scroll as usize, wrapped - app.chat_height as usize);

        for _ in 0..50 {
            app.scroll_down();
        }
        assert!(draw(&mut app, 100, 30).contains("ENDMARKER"));
    }

    #[tokio::test]
    async fn test_thinking_indicator_while_loading() {
        let mut app = echo_app();
        app.open_panel();
        app.session.set_input("Hello");
        app.send();
        // Render twice: the first pass records the chat size
        draw(&mut app, 100, 30);
        app.scroll_chat_to_bottom();
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("Assistant is thinking."));
    }
}
