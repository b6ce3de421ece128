//! Key bindings: arrows, vim-style hjkl and wasd.

use crate::grid::Direction;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shift(Direction),
    Confirm,
    Restart,
    Quit,
    None,
}

/// Map key event to game action.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('a') => Action::Shift(Direction::Left),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('d') => {
            Action::Shift(Direction::Right)
        }
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('w') => Action::Shift(Direction::Up),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('s') => Action::Shift(Direction::Down),
        KeyCode::Enter | KeyCode::Char(' ') => Action::Confirm,
        _ => Action::None,
    }
}
