//! Semantic events for the demo console — crossterm input mapped to a small
//! vocabulary so widgets never match on crossterm types.
//!
//! | Input                   | Event                      |
//! |-------------------------|----------------------------|
//! | `q`, `Ctrl+c`           | `Quit`                     |
//! | `Esc`                   | `Escape`                   |
//! | `↑` / `k`, wheel up     | `LineUp`                   |
//! | `↓` / `j`, wheel down   | `LineDown`                 |
//! | `PageUp`, `Ctrl+u`      | `PageUp`                   |
//! | `PageDown`, `Ctrl+d`    | `PageDown`                 |
//! | `G`                     | `ScrollToTail`             |
//! | `?`                     | `ToggleHelp`               |
//! | left click              | `Click { column, row }`    |
//! | terminal resize         | `Resize(w, h)`             |

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
    /// Close the details or help popup.
    Escape,
    LineUp,
    LineDown,
    PageUp,
    PageDown,
    /// Jump to the newest line.
    ScrollToTail,
    ToggleHelp,
    /// Left mouse button pressed at a terminal cell.
    Click { column: u16, row: u16 },
    Resize(u16, u16),
}

/// Map a raw crossterm [`Event`]. Returns `None` for anything unbound.
pub fn to_app_event(event: Event) -> Option<AppEvent> {
    match event {
        Event::Resize(w, h) => Some(AppEvent::Resize(w, h)),
        Event::Key(key) if key.kind == KeyEventKind::Press => map_key(key),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                Some(AppEvent::Click { column: mouse.column, row: mouse.row })
            }
            MouseEventKind::ScrollUp => Some(AppEvent::LineUp),
            MouseEventKind::ScrollDown => Some(AppEvent::LineDown),
            _ => None,
        },
        _ => None,
    }
}

fn map_key(key: KeyEvent) -> Option<AppEvent> {
    use KeyCode::*;
    use KeyModifiers as Mod;

    match key.code {
        Char('q') if key.modifiers == Mod::NONE => Some(AppEvent::Quit),
        Char('c') if key.modifiers == Mod::CONTROL => Some(AppEvent::Quit),
        Esc => Some(AppEvent::Escape),

        Up | Char('k') if key.modifiers == Mod::NONE => Some(AppEvent::LineUp),
        Down | Char('j') if key.modifiers == Mod::NONE => Some(AppEvent::LineDown),
        PageUp => Some(AppEvent::PageUp),
        PageDown => Some(AppEvent::PageDown),
        Char('u') if key.modifiers == Mod::CONTROL => Some(AppEvent::PageUp),
        Char('d') if key.modifiers == Mod::CONTROL => Some(AppEvent::PageDown),

        // SHIFT may or may not be reported with an uppercase letter
        Char('G') => Some(AppEvent::ScrollToTail),
        Char('?') => Some(AppEvent::ToggleHelp),

        _ => None,
    }
}
