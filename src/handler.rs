use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::controller::Focus;
use crate::tui::TermEvent;

const WHEEL_STEP: u16 = 3;

pub fn handle_event(app: &mut App, event: TermEvent) {
    match event {
        TermEvent::Key(key) => handle_key(app, key),
        TermEvent::Mouse(mouse) => handle_mouse(app, mouse),
        TermEvent::Resize(w, h) => {
            tracing::debug!(width = w, height = h, "terminal resized");
        }
        TermEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work with either pane focused
    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('l') if ctrl => {
            app.controller.clear_chat();
            return;
        }
        KeyCode::Tab => {
            let next = match app.controller.focus() {
                Focus::Input => Focus::Transcript,
                Focus::Transcript => Focus::Input,
            };
            app.controller.set_focus(next);
            return;
        }
        _ => {}
    }

    if app.controller.focus() == Focus::Transcript && handle_transcript_key(app, key) {
        return;
    }

    if key.code == KeyCode::Enter && app.controller.focus() == Focus::Input {
        app.controller.submit();
        return;
    }

    // Anything else pulls focus back to the input
    app.controller.refocus_input();
    let field = app.controller.gate_mut().field_mut();
    match key.code {
        KeyCode::Char(c) if !ctrl => field.insert(c),
        KeyCode::Backspace => field.backspace(),
        KeyCode::Delete => field.delete(),
        KeyCode::Left => field.move_left(),
        KeyCode::Right => field.move_right(),
        KeyCode::Home => field.move_home(),
        KeyCode::End => field.move_end(),
        _ => {}
    }
}

/// Scrolling keys for the focused transcript. Returns false for keys it doesn't own.
fn handle_transcript_key(app: &mut App, key: KeyEvent) -> bool {
    let transcript = app.controller.transcript_mut();
    let page = transcript.view_height().saturating_sub(1).max(1);
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => transcript.scroll_up(1),
        KeyCode::Down | KeyCode::Char('j') => transcript.scroll_down(1),
        KeyCode::PageUp => transcript.scroll_up(page),
        KeyCode::PageDown => transcript.scroll_down(page),
        KeyCode::Home | KeyCode::Char('g') => transcript.scroll_to_top(),
        KeyCode::End | KeyCode::Char('G') => transcript.scroll_to_end(),
        _ => return false,
    }
    true
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_transcript = app.transcript_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let on_send = app.send_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown if in_transcript => {
            app.controller.transcript_mut().scroll_down(WHEEL_STEP);
        }
        MouseEventKind::ScrollUp if in_transcript => {
            app.controller.transcript_mut().scroll_up(WHEEL_STEP);
        }
        MouseEventKind::Down(MouseButton::Left) if on_send => {
            // A disabled send button swallows the click
            if !app.controller.gate().send_button().is_disabled() {
                app.controller.submit();
            }
        }
        MouseEventKind::Down(MouseButton::Left) if in_transcript => {
            app.controller.set_focus(Focus::Transcript);
        }
        _ => {}
    }
}
