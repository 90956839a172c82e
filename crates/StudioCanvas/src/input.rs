//! # Input Protocol
//!
//! This module defines the events the host application forwards to the editor:
//! pointer events in client space, wheel events and key presses.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// State of keyboard modifiers (Shift, Ctrl, Alt, Meta).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Meta / Command / Windows key.
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on most platforms, Command on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Modifier that toggles selection membership instead of replacing it.
    pub fn toggles_selection(&self) -> bool {
        self.shift || self.command()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    /// The pointer left the canvas element; ends any gesture like `Up`.
    Leave,
}

/// A single pointer event in client space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub client_pos: Vec2,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn down(client_pos: Vec2) -> Self {
        Self::new(PointerKind::Down, client_pos)
    }

    pub fn moved(client_pos: Vec2) -> Self {
        Self::new(PointerKind::Move, client_pos)
    }

    pub fn up(client_pos: Vec2) -> Self {
        Self::new(PointerKind::Up, client_pos)
    }

    pub fn leave(client_pos: Vec2) -> Self {
        Self::new(PointerKind::Leave, client_pos)
    }

    fn new(kind: PointerKind, client_pos: Vec2) -> Self {
        Self {
            kind,
            client_pos,
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Wheel / trackpad scroll. Positive `delta.y` scrolls down (DOM convention).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WheelEvent {
    pub client_pos: Vec2,
    pub delta: Vec2,
    pub modifiers: Modifiers,
}

/// Keyboard keys the editor reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Delete,
    Backspace,
    Escape,
    A,
    Y,
    Z,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }
}
