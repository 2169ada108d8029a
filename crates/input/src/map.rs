//! Key mapping from terminal events to session actions.

use crate::types::{Direction, InputAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Map keyboard input to session actions.
pub fn handle_key_event(key: KeyEvent) -> Option<InputAction> {
    if should_quit(key) {
        return Some(InputAction::Quit);
    }
    match key.code {
        // Movement
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Char('k') => {
            Some(InputAction::Move(Direction::Up))
        }
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Char('j') => {
            Some(InputAction::Move(Direction::Down))
        }
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(InputAction::Move(Direction::Left)),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Char('l') => {
            Some(InputAction::Move(Direction::Right))
        }

        // View
        KeyCode::Char('+') | KeyCode::Char('=') => Some(InputAction::ZoomIn),
        KeyCode::Char('-') | KeyCode::Char('_') => Some(InputAction::ZoomOut),
        KeyCode::Char('m') | KeyCode::Char('M') => Some(InputAction::CycleRenderMode),
        KeyCode::Char(']') => Some(InputAction::Brighter),
        KeyCode::Char('[') => Some(InputAction::Dimmer),

        // Overlays and toggles
        KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Char('H') => Some(InputAction::ToggleHelp),
        KeyCode::Char('p') | KeyCode::Char('P') | KeyCode::Tab => Some(InputAction::TogglePlayerList),
        KeyCode::Char('t') | KeyCode::Char('T') => Some(InputAction::TogglePrediction),

        _ => None,
    }
}

/// Check if key should end the session.
pub fn should_quit(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}
