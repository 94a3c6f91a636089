use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::App;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Check if a point is inside a rectangle
fn is_in_rect(col: u16, row: u16, rect: Rect) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

/// The "[x]" in the panel's top-right border closes it.
fn is_on_close_button(col: u16, row: u16, panel: Rect) -> bool {
    row == panel.y && col + 4 >= panel.x + panel.width && col < panel.x + panel.width
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.session.is_open() {
        handle_panel_key(app, key);
    } else {
        handle_closed_key(app, key);
    }
}

fn handle_closed_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Enter | KeyCode::Char('c') | KeyCode::Char(' ') => app.open_panel(),
        _ => {}
    }
}

fn handle_panel_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_panel(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::PageUp => {
            for _ in 0..app.chat_height.max(1) / 2 {
                app.scroll_up();
            }
        }
        KeyCode::PageDown => {
            for _ in 0..app.chat_height.max(1) / 2 {
                app.scroll_down();
            }
        }
        // The input is disabled while a request is in flight
        _ if app.session.is_loading() => {}
        KeyCode::Enter => app.send(),
        _ => edit_input(app, key),
    }
}

fn edit_input(app: &mut App, key: KeyEvent) {
    let cursor = app.input_cursor;
    let input = app.session.input_mut();
    let char_count = input.chars().count();

    match key.code {
        KeyCode::Backspace => {
            if cursor > 0 {
                let byte_pos = char_to_byte_index(input, cursor - 1);
                input.remove(byte_pos);
                app.input_cursor -= 1;
            }
        }
        KeyCode::Delete => {
            if cursor < char_count {
                let byte_pos = char_to_byte_index(input, cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => app.input_cursor = cursor.saturating_sub(1),
        KeyCode::Right => app.input_cursor = (cursor + 1).min(char_count),
        KeyCode::Home => app.input_cursor = 0,
        KeyCode::End => app.input_cursor = char_count,
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(input, cursor);
            input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if !app.session.is_open() || app.session.is_loading() {
        return;
    }

    // Single-line input: newlines become spaces
    let text: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let byte_pos = char_to_byte_index(app.session.input(), app.input_cursor);
    app.session.input_mut().insert_str(byte_pos, &text);
    app.input_cursor += text.chars().count();
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let (col, row) = (mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(panel) = app.panel_area.filter(|_| app.session.is_open()) {
                if is_on_close_button(col, row, panel) {
                    app.close_panel();
                }
            } else if let Some(button) = app.button_area {
                if is_in_rect(col, row, button) {
                    app.open_panel();
                }
            }
        }
        MouseEventKind::ScrollUp => {
            if app.panel_area.is_some_and(|panel| is_in_rect(col, row, panel)) {
                app.scroll_up();
            }
        }
        MouseEventKind::ScrollDown => {
            if app.panel_area.is_some_and(|panel| is_in_rect(col, row, panel)) {
                app.scroll_down();
            }
        }
        _ => {}
    }
}
