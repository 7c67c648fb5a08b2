use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// A key press as delivered to views
pub type KeyInput = KeyEvent;

/// A key combination used to register handlers on a view.
///
/// Equality and hashing cover both the key code and the modifier set, so
/// `d` and `Ctrl-d` are distinct bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c))
    }

    #[allow(dead_code)]
    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        // SHIFT is already folded into the character for Char codes
        let modifiers = match event.code {
            KeyCode::Char(_) => event.modifiers & !KeyModifiers::SHIFT,
            _ => event.modifiers,
        };
        Self {
            code: event.code,
            modifiers,
        }
    }
}
